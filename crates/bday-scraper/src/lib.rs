pub mod client;
pub mod error;
pub mod extract;
pub mod month_page;
pub(crate) mod rate_limit;
pub mod request;
pub mod response;

pub use client::BirthdayClient;
pub use error::ScraperError;
pub use extract::{extract_from_node, normalize_birthdate, MonthExtraction};
pub use month_page::{extract_month_buckets, friends_for_month, FetchPlan};
pub use response::extract_target_object;
