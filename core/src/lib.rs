//! # Marketplace Core
//!
//! Reducer, effect and environment abstractions shared by the marketplace engines.
//!
//! Business rules live in reducers: pure functions from `(State, Action, Environment)`
//! to a mutated state plus a list of effect descriptions. The imperative shell that
//! owns persistence and delivery decides when, and whether, those effects run.
//!
//! ## Core Concepts
//!
//! - **State**: The records loaded for the current request
//! - **Action**: Commands (requests to change state) and events (facts that happened)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions, executed only after state has been committed
//! - **Environment**: Injected dependencies such as the [`environment::Clock`]
//!
//! ## Example
//!
//! ```ignore
//! use marketplace_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for BookingReducer {
//!     type State = BookingState;
//!     type Action = BookingAction;
//!     type Environment = BookingEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut BookingState,
//!         action: BookingAction,
//!         env: &BookingEnvironment,
//!     ) -> SmallVec<[Effect<BookingAction>; 4]> {
//!         // Validate, apply events, describe what must happen after commit
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - the core trait for business logic
///
/// Reducers are deterministic: given the same state, action and environment
/// they produce the same state and the same effects. All I/O is pushed out
/// into the effects they return.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Implementations validate the action, update state in place and
        /// return the effects to run once the new state has been persisted.
        /// A rejected action must leave the state it was given untouched,
        /// apart from any error bookkeeping the state type carries.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects are values, not execution. The caller of a reducer owns the
/// decision to run them, which is what lets a status write commit before any
/// subscriber gets a chance to fail.
pub mod effect {
    /// Effect type - describes a side effect to be executed after commit
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type carried by published events
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Hand a committed event to subscribers
        Publish(Action),
    }

    impl<Action> Effect<Action> {
        /// Returns `true` if running this effect would do nothing
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// The event this effect publishes, if any
        #[must_use]
        pub fn into_published(self) -> Option<Action> {
            match self {
                Effect::None => None,
                Effect::Publish(action) => Some(action),
            }
        }
    }
}

/// Environment module - dependency injection traits
///
/// External dependencies are abstracted behind traits and injected through
/// the reducer's Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    ///
    /// // Tests - fixed time for deterministic assertions
    /// let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(noon));
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;

    #[test]
    fn published_events_keep_their_order() {
        let effects = vec![Effect::Publish(1), Effect::None, Effect::Publish(2)];

        let published: Vec<_> = effects.into_iter().filter_map(Effect::into_published).collect();

        assert_eq!(published, vec![1, 2]);
    }

    #[test]
    fn only_none_is_none() {
        assert!(Effect::<u8>::None.is_none());
        assert!(!Effect::Publish(1_u8).is_none());
    }
}
