//! # Log Type Colors
//!
//! Assigns each log type a color from a fixed palette, round-robin, on first
//! use. Assignments never change for the life of the provider.
//!
//! The palette has ten entries. An eleventh log type wraps around and shares
//! a color with the first one; per-log-type distinctness is lost past that
//! point. That collision is accepted and logged, not resolved.

use std::collections::HashMap;

/// Color-blind-safe categorical palette.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#54B399", "#6092C0", "#D36086", "#9170B8", "#CA8EAE", "#D6BF57", "#B9A888", "#DA8B45",
    "#AA6556", "#E7664C",
];

#[derive(Debug, Clone)]
pub struct ColorProvider {
    palette: Vec<String>,
    assigned: HashMap<String, String>,
    /// Next palette slot. Only ever incremented.
    position: usize,
}

impl ColorProvider {
    pub fn new() -> Self {
        Self::with_palette(DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect())
    }

    /// Build from a custom palette. An empty palette falls back to the default.
    pub fn with_palette(palette: Vec<String>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
        } else {
            palette
        };
        Self {
            palette,
            assigned: HashMap::new(),
            position: 0,
        }
    }

    /// Color for a log type, assigning the next palette slot on first call.
    pub fn get_color(&mut self, log_type: &str) -> String {
        if let Some(color) = self.assigned.get(log_type) {
            return color.clone();
        }

        let slot = self.position % self.palette.len();
        if self.position > 0 && slot == 0 {
            log::warn!(
                "Color palette exhausted at log type '{}'; reusing colors from the start ({} slots)",
                log_type,
                self.palette.len()
            );
        }
        let color = self.palette[slot].clone();
        self.position += 1;
        self.assigned.insert(log_type.to_string(), color.clone());
        color
    }

    /// Current assignments, for legends next to the graph.
    pub fn assignments(&self) -> &HashMap<String, String> {
        &self.assigned
    }

    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }
}

impl Default for ColorProvider {
    fn default() -> Self {
        Self::new()
    }
}
