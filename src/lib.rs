//! `pageshift` - page-transition coordinator for single-page sites
//!
//! Intercepts in-site link clicks and plays them as a cover → navigate →
//! reveal sequence around the router's page swap. The
//! [`transition::TransitionCoordinator`] owns the sequence; the router,
//! viewport and overlay are collaborators behind small traits, and a
//! [`session::Session`] wires them together from a YAML site file.

pub mod cli;
pub mod config;
pub mod error;
pub mod link;
pub mod nav;
pub mod observability;
pub mod overlay;
pub mod route;
pub mod router;
pub mod session;
pub mod site;
pub mod transition;
pub mod viewport;
