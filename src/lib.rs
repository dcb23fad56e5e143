//! # wayscribe
//!
//! A retrieval-grounded travel-narrative engine: it blends a remembered user
//! preference profile with context retrieved from a local knowledge base and
//! asks a generation oracle for a structured short narrative, then learns
//! from post-journey feedback through a second, independent oracle call.
//!
//! ## Architecture
//!
//! - **Narrative pipeline** (`narrative`): preferences → embedding → context
//!   retrieval → one prompt → one completion → strict parse
//! - **Reflection** (`reflect`): feedback → one completion → strict JSON
//!   validation → wholesale profile upsert
//! - **Collaborators** (`llm`, `embed`, `index`, `profile`, `catalog`,
//!   `route`): trait seams with Ollama, HNSW, and redb implementations
//! - **Facade** (`planner`): composition-root wiring plus whole-journey
//!   orchestration
//!
//! Narrative generation has exactly two caller-distinguishable failure
//! modes: retrieval failures (embedding oracle down, retryable) and
//! malformed oracle output. Preference-store reads degrade to the empty
//! profile, and reflection failures are absorbed by the facade — neither
//! ever takes a journey down.
//!
//! ## Library usage
//!
//! ```no_run
//! use wayscribe::config::PlannerConfig;
//! use wayscribe::narrative::JourneyRequest;
//! use wayscribe::planner::JourneyPlanner;
//!
//! let planner = JourneyPlanner::open(&PlannerConfig::default()).unwrap();
//! let plan = planner
//!     .plan_journey(&JourneyRequest {
//!         user_id: "u1".into(),
//!         origin: (6.45, 7.51),
//!         city: "Enugu".into(),
//!         goal_query: "a quiet walk with some history".into(),
//!         destination_id: "poi-1".into(),
//!     })
//!     .unwrap();
//! println!("{}", plan.narrative.title);
//! ```

pub mod catalog;
pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod llm;
pub mod narrative;
pub mod planner;
pub mod profile;
pub mod prompt;
pub mod reflect;
pub mod route;
