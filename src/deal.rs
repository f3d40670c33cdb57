/// Storefronts the bot watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Store {
    Steam,
    Epic,
}

impl Store {
    pub const ALL: [Store; 2] = [Store::Steam, Store::Epic];

    /// Human-facing name used in announcements
    pub fn label(&self) -> &'static str {
        match self {
            Store::Steam => "Steam",
            Store::Epic => "Epic Games",
        }
    }
}

impl std::fmt::Display for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Store::Steam => write!(f, "Steam"),
            Store::Epic => write!(f, "Epic"),
        }
    }
}

/// A discounted or free listing that passed its store's eligibility rule.
/// Produced fresh every cycle; only its id is ever persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    pub store: Store,
    pub id: String,
    pub name: String,
    pub discount_percent: i64,
    pub final_price: f64,
    pub currency: String,
    pub description: Option<String>,
}

/// Supplementary data shown alongside a deal
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub description: String,
    pub rating: String,
}

impl Detail {
    pub const UNKNOWN_RATING: &'static str = "Unknown";
    pub const NO_RATING: &'static str = "N/A";
}
