//! Competitor price monitor
//!
//! A synthetic emitter feeds price observations into an inbound queue, a
//! two-stage reasoning evaluator decides which ones deserve attention, and
//! alerts accumulate in an outbound queue read by the terminal dashboard.

#[cfg(test)]
mod tests;

pub mod catalog;
pub mod config;
pub mod connectivity;
pub mod emitter;
pub mod evaluator;
pub mod event;
pub mod queue;
pub mod reasoning;
pub mod runtime;
pub mod ui;

pub use {
    catalog::{Catalog, Product},
    config::{ConfigError, Settings},
    emitter::PriceEmitter,
    evaluator::{Decision, DecisionRule, Evaluator},
    event::PriceEvent,
    queue::EventQueue,
    reasoning::{Agent, Persona, ReasoningError, ReasoningService},
    runtime::Pipeline,
};
