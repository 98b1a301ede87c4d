pub mod catalog;
pub mod genre_resolver;
pub mod orchestrator;
pub mod plot_scorer;
pub mod providers;
pub mod retry;

pub use catalog::{CatalogClient, CatalogFetch, FetchNotice};
pub use genre_resolver::{GenreResolver, Signal};
pub use orchestrator::{Orchestrator, Phase, Preferences, RequestContext};
pub use plot_scorer::PlotScorer;
pub use retry::RetryPolicy;
