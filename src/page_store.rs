use std::{collections::BTreeMap, path::Path};

use anyhow::Context as _;

use crate::{
    deck::PageDeck,
    error::{FlipbookError, FlipbookResult},
};

/// Decoded page pixels: premultiplied RGBA8, row-major.
#[derive(Clone, Debug)]
pub struct RgbaPage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbaPage {
    pub fn from_straight_rgba(width: u32, height: u32, mut data: Vec<u8>) -> FlipbookResult<Self> {
        if data.len() != (width as usize) * (height as usize) * 4 {
            return Err(FlipbookError::validation(
                "page pixel buffer size must be width*height*4",
            ));
        }
        for px in data.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a < 255 {
                for c in &mut px[..3] {
                    *c = ((u16::from(*c) * a + 127) / 255) as u8;
                }
            }
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * 4);
        for _ in 0..width * height {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Nearest-neighbour sample at normalized coordinates in [0,1).
    pub fn sample(&self, u: f64, v: f64) -> [u8; 4] {
        let x = ((u * self.width as f64) as u32).min(self.width - 1);
        let y = ((v * self.height as f64) as u32).min(self.height - 1);
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

/// Resolves a page's opaque content key to pixels. The deck never touches
/// pixels itself; this is the seam to the image-source collaborator.
pub trait PageStore {
    fn get(&self, key: &str) -> FlipbookResult<&RgbaPage>;
}

#[derive(Debug, Default)]
pub struct MemoryPageStore {
    pages: BTreeMap<String, RgbaPage>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, page: RgbaPage) {
        self.pages.insert(key.into(), page);
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageStore for MemoryPageStore {
    fn get(&self, key: &str) -> FlipbookResult<&RgbaPage> {
        self.pages
            .get(key)
            .ok_or_else(|| FlipbookError::validation(format!("no page content for key '{key}'")))
    }
}

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "bmp"];

/// Load every image file of a directory as one deck, in sorted file-name
/// order (so `page_01.jpg`, `page_02.jpg`, ... arrive in reading order).
pub fn load_directory(dir: &Path, seed: u64) -> FlipbookResult<(PageDeck, MemoryPageStore)> {
    let mut names = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read pages directory '{}'", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| "read directory entry")?;
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if path.is_file() && is_image {
            names.push(path);
        }
    }
    names.sort();

    if names.is_empty() {
        return Err(FlipbookError::validation(format!(
            "no image files found in '{}'",
            dir.display()
        )));
    }

    let mut store = MemoryPageStore::new();
    let mut keys = Vec::with_capacity(names.len());
    for path in &names {
        let img = image::ImageReader::open(path)
            .with_context(|| format!("open page image '{}'", path.display()))?
            .decode()
            .with_context(|| format!("decode page image '{}'", path.display()))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        let page = RgbaPage::from_straight_rgba(w, h, img.into_raw())?;
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                FlipbookError::validation(format!("non-UTF8 file name '{}'", path.display()))
            })?;
        store.insert(key.clone(), page);
        keys.push(key);
    }

    let deck = PageDeck::from_content_keys(keys, seed);
    deck.validate()?;
    Ok((deck, store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_straight_rgba_premultiplies() {
        let page = RgbaPage::from_straight_rgba(1, 1, vec![255, 0, 0, 128]).unwrap();
        assert_eq!(page.data, vec![128, 0, 0, 128]);
    }

    #[test]
    fn from_straight_rgba_rejects_bad_length() {
        assert!(RgbaPage::from_straight_rgba(2, 2, vec![0; 4]).is_err());
    }

    #[test]
    fn sample_clamps_to_edges() {
        let page = RgbaPage::solid(2, 2, [10, 20, 30, 255]);
        assert_eq!(page.sample(0.999, 0.999), [10, 20, 30, 255]);
        assert_eq!(page.sample(0.0, 0.0), [10, 20, 30, 255]);
    }

    #[test]
    fn store_reports_missing_keys() {
        let mut store = MemoryPageStore::new();
        store.insert("a", RgbaPage::solid(1, 1, [0, 0, 0, 255]));
        assert!(store.get("a").is_ok());
        assert!(store.get("b").is_err());
    }
}
