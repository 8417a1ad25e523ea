//! `yield from` targets
//!
//! A delegate is either another generator (full protocol) or a plain guest
//! iterator. Plain iterators surface the optional parts of the protocol
//! through capability accessors instead of being probed by name.

use super::Generator;
use crate::engine::types::{ErrorInfo, Val};
use std::collections::VecDeque;
use std::fmt;

/// One step of a plain iterator
#[derive(Debug, Clone, PartialEq)]
pub enum IterStep {
    Yield(Val),
    /// Exhausted, with an optional return value
    Done(Option<Val>),
}

/// Accepts values sent into it
pub trait SendInto {
    fn send(&mut self, value: Val) -> Result<IterStep, ErrorInfo>;
}

/// Accepts exceptions thrown into it
pub trait ThrowInto {
    fn throw(&mut self, exc: ErrorInfo) -> Result<IterStep, ErrorInfo>;
}

/// Can release its resources early
pub trait Closable {
    fn close(&mut self) -> Result<(), ErrorInfo>;
}

/// Guest iterator as seen by the generator adapter
///
/// Only `next` is mandatory. An iterator that supports more of the protocol
/// returns itself from the matching accessor.
pub trait GuestIterator {
    /// Name used in error messages
    fn type_name(&self) -> &str;

    fn next(&mut self) -> Result<IterStep, ErrorInfo>;

    fn as_sender(&mut self) -> Option<&mut dyn SendInto> {
        None
    }

    fn as_thrower(&mut self) -> Option<&mut dyn ThrowInto> {
        None
    }

    fn as_closer(&mut self) -> Option<&mut dyn Closable> {
        None
    }
}

/// Target of a `yield from`
pub enum Delegate {
    Generator(Generator),
    Iterator(Box<dyn GuestIterator>),
}

impl Delegate {
    pub fn iterator(iterator: impl GuestIterator + 'static) -> Self {
        Delegate::Iterator(Box::new(iterator))
    }

    pub fn describe(&self) -> &str {
        match self {
            Delegate::Generator(generator) => generator.name(),
            Delegate::Iterator(iterator) => iterator.type_name(),
        }
    }

    /// Owned snapshot for introspection
    pub fn info(&self) -> DelegateInfo {
        match self {
            Delegate::Generator(generator) => DelegateInfo::Generator(generator.clone()),
            Delegate::Iterator(iterator) => DelegateInfo::Iterator(iterator.type_name().to_string()),
        }
    }
}

/// What a generator is currently delegating to
///
/// Detached from the generator, so it can be held while the generator keeps
/// running.
#[derive(Debug, Clone)]
pub enum DelegateInfo {
    Generator(Generator),
    /// Plain iterator, by type name
    Iterator(String),
}

impl DelegateInfo {
    pub fn describe(&self) -> &str {
        match self {
            DelegateInfo::Generator(generator) => generator.name(),
            DelegateInfo::Iterator(type_name) => type_name,
        }
    }

    pub fn as_generator(&self) -> Option<&Generator> {
        match self {
            DelegateInfo::Generator(generator) => Some(generator),
            DelegateInfo::Iterator(_) => None,
        }
    }
}

impl From<Generator> for Delegate {
    fn from(generator: Generator) -> Self {
        Delegate::Generator(generator)
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delegate::Generator(generator) => f.debug_tuple("Generator").field(generator).finish(),
            Delegate::Iterator(iterator) => f
                .debug_tuple("Iterator")
                .field(&iterator.type_name())
                .finish(),
        }
    }
}

/* ===================== List iterator ===================== */

/// Iterator over a fixed list of values; supports `next` only
#[derive(Debug, Clone, Default)]
pub struct ListIter {
    items: VecDeque<Val>,
}

impl ListIter {
    pub fn new(items: impl IntoIterator<Item = Val>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl GuestIterator for ListIter {
    fn type_name(&self) -> &str {
        "list_iterator"
    }

    fn next(&mut self) -> Result<IterStep, ErrorInfo> {
        Ok(match self.items.pop_front() {
            Some(item) => IterStep::Yield(item),
            None => IterStep::Done(None),
        })
    }
}
