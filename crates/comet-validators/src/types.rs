//! Validator records and the published page view.

use comet_gateway::ValidatorRaw;

/// A metric that is fetched after the record itself.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Metric<T> {
    /// Fetch still in flight.
    #[default]
    Pending,
    /// Fetch succeeded.
    Loaded(T),
    /// Fetch failed or the value could not be requested.
    Failed,
}

impl<T> Metric<T> {
    /// Map a fetch result onto a settled metric.
    pub fn settle(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Loaded(v),
            None => Self::Failed,
        }
    }

    /// Whether the fetch has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The loaded value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Loaded(v) => Some(v),
            _ => None,
        }
    }
}

/// One validator on the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorRecord {
    /// Validator address.
    pub address: String,
    /// Voting power.
    pub voting_power: u64,
    /// Commission rate as reported, `"0"` when absent.
    pub commission: String,
    /// Fraction of blocks signed over `[0, latest height]`.
    pub uptime: Metric<f64>,
    /// Commit signature count.
    pub commit_signatures: Metric<u64>,
}

impl ValidatorRecord {
    /// A record with the listing's fields filled in and metrics pending.
    pub fn skeleton(raw: ValidatorRaw) -> Self {
        Self {
            address: raw.address,
            voting_power: raw.voting_power,
            commission: raw.commission.unwrap_or_else(|| "0".to_string()),
            uptime: Metric::Pending,
            commit_signatures: Metric::Pending,
        }
    }

    /// Uptime as a percentage with two decimals, e.g. `"98.76"`.
    pub fn uptime_percent(&self) -> Option<String> {
        self.uptime.value().map(|u| format!("{:.2}", u * 100.0))
    }

    /// Whether both metrics have settled.
    pub fn is_settled(&self) -> bool {
        self.uptime.is_settled() && self.commit_signatures.is_settled()
    }
}

/// Progress of the current page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Listing or metrics still loading.
    Loading,
    /// Every metric on the page has settled.
    Loaded,
    /// The listing could not be fetched.
    Unavailable,
}

/// How a call to [`load_page`](crate::ValidatorAggregator::load_page) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Every metric settled and the page was marked loaded.
    Loaded,
    /// A newer load started first; nothing more was published.
    Superseded,
    /// The validator listing was unavailable.
    Unavailable,
}

/// What a consumer renders for the current page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageView {
    /// Load this view belongs to; bumped by every new load.
    pub generation: u64,
    /// Page number.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
    /// Validators in the whole set, as reported by the listing.
    pub total: u64,
    /// Load progress.
    pub status: LoadStatus,
    /// Records in listing order.
    pub records: Vec<ValidatorRecord>,
}

impl PageView {
    pub(crate) fn loading(generation: u64, page: u32, per_page: u32) -> Self {
        Self {
            generation,
            page,
            per_page,
            status: LoadStatus::Loading,
            ..Default::default()
        }
    }

    /// Whether the page finished loading.
    pub fn is_loaded(&self) -> bool {
        self.status == LoadStatus::Loaded
    }
}
