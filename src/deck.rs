use crate::error::{FlipbookError, FlipbookResult};

/// Stable identity of a page: its 0-based position at deck creation.
/// Content may be swapped in place without changing the id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct PageId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PageKind {
    Image,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PageRecord {
    pub id: PageId,
    /// Opaque content key, resolved by a [`PageStore`](crate::page_store::PageStore).
    pub content: String,
    pub kind: PageKind,
}

/// Ordered collection of page records. Pure data, no behavior beyond
/// validation and in-place content swaps.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PageDeck {
    pub pages: Vec<PageRecord>,
    /// Drives the deterministic per-page resting jitter.
    pub seed: u64,
}

impl PageDeck {
    /// Build a deck from ordered content keys; ids are assigned 0..n.
    pub fn from_content_keys(keys: impl IntoIterator<Item = String>, seed: u64) -> Self {
        let pages = keys
            .into_iter()
            .enumerate()
            .map(|(i, content)| PageRecord {
                id: PageId(i as u32),
                content,
                kind: PageKind::Image,
            })
            .collect();
        Self { pages, seed }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, id: PageId) -> Option<&PageRecord> {
        self.pages.get(id.0 as usize)
    }

    /// Swap one page's content in place (the AI-edit path). Identity and
    /// position are untouched.
    pub fn replace_content(&mut self, id: PageId, content: String) -> FlipbookResult<()> {
        let page = self
            .pages
            .get_mut(id.0 as usize)
            .ok_or_else(|| FlipbookError::validation(format!("no page with id {}", id.0)))?;
        page.content = content;
        Ok(())
    }

    pub fn validate(&self) -> FlipbookResult<()> {
        for (i, page) in self.pages.iter().enumerate() {
            if page.id.0 as usize != i {
                return Err(FlipbookError::validation(format!(
                    "page at position {i} has id {} (ids must be 0..n in order)",
                    page.id.0
                )));
            }
            if page.content.trim().is_empty() {
                return Err(FlipbookError::validation(format!(
                    "page {} has an empty content key",
                    page.id.0
                )));
            }
        }
        Ok(())
    }

    /// Resting rotation of a page around its center, in [-0.75, 0.75] degrees.
    /// Seeded so that export frames are bit-reproducible.
    pub fn jitter_deg(&self, id: PageId) -> f64 {
        let h = mix64(self.seed ^ (u64::from(id.0).wrapping_mul(0x9E37_79B9_7F4A_7C15)));
        let unit = (h >> 11) as f64 / (1u64 << 53) as f64; // [0,1)
        unit * 1.5 - 0.75
    }
}

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(n: usize) -> PageDeck {
        PageDeck::from_content_keys((0..n).map(|i| format!("page_{i:02}")), 7)
    }

    #[test]
    fn from_content_keys_assigns_sequential_ids() {
        let d = deck(3);
        assert_eq!(d.len(), 3);
        assert_eq!(d.pages[2].id, PageId(2));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn replace_content_keeps_identity_and_position() {
        let mut d = deck(3);
        d.replace_content(PageId(1), "edited".to_string()).unwrap();
        assert_eq!(d.pages[1].id, PageId(1));
        assert_eq!(d.pages[1].content, "edited");
        assert!(d.replace_content(PageId(9), "x".to_string()).is_err());
    }

    #[test]
    fn validate_rejects_out_of_order_ids() {
        let mut d = deck(2);
        d.pages[0].id = PageId(1);
        assert!(d.validate().is_err());
    }

    #[test]
    fn jitter_is_deterministic_and_bounded() {
        let d = deck(8);
        for i in 0..8u32 {
            let a = d.jitter_deg(PageId(i));
            let b = d.jitter_deg(PageId(i));
            assert_eq!(a, b);
            assert!((-0.75..=0.75).contains(&a));
        }
        // Different pages should not all share one angle.
        assert_ne!(d.jitter_deg(PageId(0)), d.jitter_deg(PageId(1)));
    }

    #[test]
    fn json_roundtrip() {
        let d = deck(2);
        let s = serde_json::to_string(&d).unwrap();
        let de: PageDeck = serde_json::from_str(&s).unwrap();
        assert_eq!(de.len(), 2);
        assert_eq!(de.seed, 7);
    }
}
