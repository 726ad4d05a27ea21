//! Event, symbol and priority primitives.
//!
//! A machine's states and event kinds are plain labels. Both implement
//! [`Symbol`], which gives them a stable numeric id for trace records and a
//! printable name. Events carry their payload in the implementing type; the
//! engine only ever looks at [`Event::kind`].

use core::fmt;
use core::hash::Hash;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A finite, enumerable label (state or event kind).
pub trait Symbol: Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every value, in declaration order.
    const ALL: &'static [Self];

    fn id(self) -> u16;

    fn name(self) -> &'static str;
}

/// Declares a fieldless enum implementing [`Symbol`] and `Display`.
///
/// ```
/// hf_fsm::symbols! {
///     pub enum Light { Off, On }
/// }
///
/// use hf_fsm::Symbol;
/// assert_eq!(Light::On.id(), 1);
/// assert_eq!(Light::ALL, &[Light::Off, Light::On]);
/// assert_eq!(Light::Off.to_string(), "Off");
/// ```
#[macro_export]
macro_rules! symbols {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u16)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::Symbol for $name {
            const ALL: &'static [Self] = &[$( Self::$variant ),+];

            fn id(self) -> u16 {
                self as u16
            }

            fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => stringify!($variant) ),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str($crate::Symbol::name(*self))
            }
        }
    };
}

/// A typed event delivered to a machine.
pub trait Event: fmt::Debug + Send + 'static {
    type Kind: Symbol;

    fn kind(&self) -> Self::Kind;
}

/// Delivery class of a submitted event.
///
/// `High` and `Low` select one of the engine's two bounded queues.
/// `Immediate` is only meaningful from inside a transition action: the event
/// is dispatched right after the current transition commits, ahead of
/// anything already queued.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Immediate,
    High,
    Low,
}

impl Priority {
    pub(crate) fn trace_code(self) -> u8 {
        use hf_trace::records::priority;
        match self {
            Self::Immediate => priority::IMMEDIATE,
            Self::High => priority::HIGH,
            Self::Low => priority::LOW,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Immediate => "immediate",
            Self::High => "high",
            Self::Low => "low",
        };
        f.write_str(label)
    }
}

/// A queued event stamped with its submission time.
#[derive(Debug)]
pub struct Envelope<E> {
    pub event: E,
    pub priority: Priority,
    pub posted_at: Instant,
}

impl<E> Envelope<E> {
    pub fn new(event: E, priority: Priority) -> Self {
        Self {
            event,
            priority,
            posted_at: Instant::now(),
        }
    }

    /// Time spent waiting in the queue so far.
    pub fn age(&self) -> Duration {
        self.posted_at.elapsed()
    }
}
