//! Usage statistics decorator
//!
//! Wraps any format builder, forwards every call unchanged and records
//! which patterns, samples and ornaments are actually reachable from the
//! position list. Parsers then decode only those entities, so a corrupted
//! but unused sample cannot block an otherwise valid module.
//!
//! Builder callbacks are infallible. The first contract violation seen by
//! the decorator is stored and reported by the `used_*` accessors.

use crate::{DecodeError, Indices, PatternBuilder};

/// Index domains and defaults of a format
#[derive(Debug, Clone, Copy)]
pub struct UsageLimits {
    pub patterns: usize,
    pub samples: usize,
    pub ornaments: usize,
    /// Sample active before any channel selects one
    pub default_sample: usize,
    /// Ornament active before any channel selects one
    pub default_ornament: usize,
}

#[derive(Debug, Default)]
struct ConstructionOrder {
    pattern: Option<usize>,
    line: Option<usize>,
    channel: Option<usize>,
}

/// Builder decorator collecting usage sets
#[derive(Debug)]
pub struct StatisticCollectingBuilder<B> {
    delegate: B,
    patterns: Indices,
    samples: Indices,
    ornaments: Indices,
    order: ConstructionOrder,
    failure: Option<DecodeError>,
}

impl<B> StatisticCollectingBuilder<B> {
    pub fn new(delegate: B, limits: UsageLimits) -> Self {
        let mut builder = Self {
            delegate,
            patterns: Indices::new(0, limits.patterns.saturating_sub(1)),
            samples: Indices::new(0, limits.samples.saturating_sub(1)),
            ornaments: Indices::new(0, limits.ornaments.saturating_sub(1)),
            order: ConstructionOrder::default(),
            failure: None,
        };
        builder.record_sample(limits.default_sample);
        builder.record_ornament(limits.default_ornament);
        builder
    }

    /// The wrapped builder
    pub fn delegate(&mut self) -> &mut B {
        &mut self.delegate
    }

    pub fn into_inner(self) -> B {
        self.delegate
    }

    fn check(&self) -> Result<(), DecodeError> {
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// Patterns referenced by the positions list
    pub fn used_patterns(&self) -> Result<&Indices, DecodeError> {
        self.check()?;
        if self.patterns.is_empty() {
            return Err(DecodeError::EmptyPositions);
        }
        Ok(&self.patterns)
    }

    /// Samples selected by channel commands, plus the default one
    pub fn used_samples(&self) -> Result<&Indices, DecodeError> {
        self.check()?;
        Ok(&self.samples)
    }

    /// Ornaments selected by channel commands, plus the default one
    pub fn used_ornaments(&self) -> Result<&Indices, DecodeError> {
        self.check()?;
        Ok(&self.ornaments)
    }

    fn fail(&mut self, error: DecodeError) {
        tracing::debug!(%error, "Builder contract violated");
        self.failure.get_or_insert(error);
    }

    pub fn record_positions(&mut self, patterns: impl IntoIterator<Item = usize>) {
        match self.patterns.assign(patterns) {
            Err(error) => self.fail(error),
            Ok(()) if self.patterns.is_empty() => self.fail(DecodeError::EmptyPositions),
            Ok(()) => {}
        }
    }

    pub fn record_sample(&mut self, index: usize) {
        if let Err(error) = self.samples.insert(index) {
            self.fail(error);
        }
    }

    pub fn record_ornament(&mut self, index: usize) {
        if let Err(error) = self.ornaments.insert(index) {
            self.fail(error);
        }
    }

    fn check_order(&mut self, what: &'static str, previous: Option<usize>, index: usize) {
        if let Some(previous) = previous.filter(|&p| index <= p) {
            self.fail(DecodeError::OutOfOrder {
                what,
                index,
                previous,
            });
        }
    }

    /// Track a new pattern; patterns are started in ascending order
    pub fn begin_pattern(&mut self, index: usize) {
        debug_assert!(
            self.patterns.contains(index),
            "pattern {index} is not referenced by positions"
        );
        self.check_order("pattern", self.order.pattern, index);
        self.order = ConstructionOrder {
            pattern: Some(index),
            line: None,
            channel: None,
        };
    }

    pub fn check_sample_declaration(&self, index: usize) {
        debug_assert!(
            self.samples.contains(index),
            "sample {index} is declared but not used"
        );
    }

    pub fn check_ornament_declaration(&self, index: usize) {
        debug_assert!(
            self.ornaments.contains(index),
            "ornament {index} is declared but not used"
        );
    }
}

impl<B: PatternBuilder> PatternBuilder for StatisticCollectingBuilder<B> {
    fn finish(&mut self, size: usize) {
        self.delegate.finish(size);
    }

    fn start_line(&mut self, index: usize) {
        self.check_order("line", self.order.line, index);
        self.order.line = Some(index);
        self.order.channel = None;
        self.delegate.start_line(index);
    }

    fn start_channel(&mut self, index: usize) {
        self.check_order("channel", self.order.channel, index);
        self.order.channel = Some(index);
        self.delegate.start_channel(index);
    }

    fn set_tempo(&mut self, tempo: u32) {
        self.delegate.set_tempo(tempo);
    }
}
