pub mod adapters;
pub mod aggregator;
pub mod composer;
pub mod delivery;
pub mod generator;
pub mod pipeline;
pub mod schedule;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use aggregator::{plan_categories, CategoryPlan, SearchAggregator};
pub use composer::PromptComposer;
pub use delivery::{parse_recipients, render_html, DeliveryAgent, DeliverySettings, DeliveryState};
pub use generator::{GenerationClient, GenerationFailure, GenerationOutcome};
pub use pipeline::{BriefingDeps, BriefingRun, RunReport};
pub use schedule::{is_first_workday_of_week, WorkCalendar};
pub use traits::{MailTransport, RawHit, SearchQuery, TextGenerator, WebSearcher};
