//! Recyclable visual symbol slots
//!
//! Slots live in a flat arena and are addressed by [`SlotId`]. The pool
//! knows nothing about any render tree; it only records what a renderer
//! needs to draw each slot.

use std::sync::Arc;

use rf_slot_math::{SymbolId, SymbolRegistry};

use crate::assets::{ImageHandle, SymbolImageLoader};

/// Index of a slot in its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One pooled visual slot
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRecord {
    /// Symbol currently shown
    pub symbol: SymbolId,
    /// Resting position at offset 0
    pub origin: f64,
    /// Wrap count at the last sync
    pub lap: i64,
    /// Rendered position at the last sync
    pub position: f64,
    /// Inside the drawn band at the last sync
    pub visible: bool,
    /// Win highlight
    pub highlighted: bool,
    active: bool,
    blurred: bool,
    image: Option<ImageHandle>,
    blur_image: Option<ImageHandle>,
}

impl SlotRecord {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Image to draw: the blurred variant while blur is on, when there is one
    pub fn image(&self) -> Option<&ImageHandle> {
        if self.blurred {
            self.blur_image.as_ref().or(self.image.as_ref())
        } else {
            self.image.as_ref()
        }
    }

    pub fn is_blurred(&self) -> bool {
        self.blurred
    }
}

/// Arena of slots with a free list and a per-sync row lookup cache
pub struct SymbolSlotPool {
    slots: Vec<SlotRecord>,
    free: Vec<SlotId>,
    blur: bool,
    registry: Arc<SymbolRegistry>,
    loader: Arc<dyn SymbolImageLoader>,
    bundle: String,
    row_positions: Vec<f64>,
    row_tolerance: f64,
    row_cache: Option<Vec<Option<SlotId>>>,
}

impl SymbolSlotPool {
    pub fn new(
        registry: Arc<SymbolRegistry>,
        loader: Arc<dyn SymbolImageLoader>,
        bundle: impl Into<String>,
        row_positions: Vec<f64>,
        row_tolerance: f64,
    ) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            blur: false,
            registry,
            loader,
            bundle: bundle.into(),
            row_positions,
            row_tolerance,
            row_cache: None,
        }
    }

    /// Take a free slot (or grow the arena) and dress it as `symbol`
    pub fn acquire(&mut self, symbol: &SymbolId) -> SlotId {
        let (image, blur_image) = self.load_images(symbol);
        let record = SlotRecord {
            symbol: symbol.clone(),
            origin: 0.0,
            lap: 0,
            position: 0.0,
            visible: false,
            highlighted: false,
            active: true,
            blurred: self.blur,
            image,
            blur_image,
        };

        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = record;
                id
            }
            None => {
                self.slots.push(record);
                SlotId(self.slots.len() - 1)
            }
        };
        self.row_cache = None;
        id
    }

    /// Deactivate a slot and return it to the free list
    pub fn release(&mut self, id: SlotId) {
        let Some(slot) = self.slots.get_mut(id.0) else {
            return;
        };
        if !slot.active {
            return;
        }
        slot.active = false;
        slot.visible = false;
        slot.highlighted = false;
        self.free.push(id);
        self.row_cache = None;
    }

    /// Swap a slot's identity
    pub fn assign(&mut self, id: SlotId, symbol: &SymbolId) {
        let (image, blur_image) = self.load_images(symbol);
        if let Some(slot) = self.slots.get_mut(id.0).filter(|s| s.active) {
            slot.symbol = symbol.clone();
            slot.image = image;
            slot.blur_image = blur_image;
        }
    }

    pub fn get(&self, id: SlotId) -> Option<&SlotRecord> {
        self.slots.get(id.0).filter(|s| s.active)
    }

    pub(crate) fn get_mut(&mut self, id: SlotId) -> Option<&mut SlotRecord> {
        self.slots.get_mut(id.0).filter(|s| s.active)
    }

    /// Active slots in arena order
    pub fn active(&self) -> impl Iterator<Item = (SlotId, &SlotRecord)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| (SlotId(i), s))
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Drop the row lookup cache; called once per position sync
    pub fn invalidate_rows(&mut self) {
        self.row_cache = None;
    }

    /// Slot resting on visible row `row` (0 = top), within the row tolerance
    pub fn slot_at_row(&mut self, row: usize) -> Option<SlotId> {
        if self.row_cache.is_none() {
            let cache = self
                .row_positions
                .iter()
                .map(|&y| {
                    self.active()
                        .find(|(_, s)| (s.position - y).abs() <= self.row_tolerance)
                        .map(|(id, _)| id)
                })
                .collect();
            self.row_cache = Some(cache);
        }
        self.row_cache
            .as_ref()
            .and_then(|cache| cache.get(row).copied().flatten())
    }

    /// Toggle the motion-blur artwork on every active slot
    pub fn set_blur(&mut self, blur: bool) {
        if self.blur == blur {
            return;
        }
        self.blur = blur;
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            slot.blurred = blur;
        }
    }

    pub fn is_blurred(&self) -> bool {
        self.blur
    }

    pub fn reset_highlights(&mut self) {
        for slot in &mut self.slots {
            slot.highlighted = false;
        }
    }

    fn load_images(&self, symbol: &SymbolId) -> (Option<ImageHandle>, Option<ImageHandle>) {
        let Some(def) = self.registry.get(symbol) else {
            log::warn!("No symbol definition for {symbol}; slot keeps no image");
            return (None, None);
        };
        let image = self
            .loader
            .load_image_for_symbol(&self.bundle, &def.image_path);
        if image.is_none() {
            log::debug!("Image {} for {} unavailable", def.image_path, symbol);
        }
        let blur_image = def
            .blur_image_path
            .as_deref()
            .and_then(|path| self.loader.load_image_for_symbol(&self.bundle, path));
        (image, blur_image)
    }
}

impl std::fmt::Debug for SymbolSlotPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolSlotPool")
            .field("slots", &self.slots)
            .field("free", &self.free)
            .field("blur", &self.blur)
            .field("bundle", &self.bundle)
            .finish()
    }
}
