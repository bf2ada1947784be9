//! Branch and warehouse selections.

use serde::{Deserialize, Serialize};

/// Currently selected branch. `id == 0` means none selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub label: String,
}

/// Currently selected warehouse. `id == 0` means none selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: i64,
    pub label: String,
}

impl Branch {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.id != 0
    }
}

impl Warehouse {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }

    pub fn is_selected(&self) -> bool {
        self.id != 0
    }
}

#[cfg(test)]
mod tests {
    use super::{Branch, Warehouse};

    #[test]
    fn zero_id_means_nothing_selected() {
        assert!(!Branch::default().is_selected());
        assert!(Branch::new(5, "Main").is_selected());
        assert!(!Warehouse::new(0, "North").is_selected());
        assert!(Warehouse::new(3, "North").is_selected());
    }
}
