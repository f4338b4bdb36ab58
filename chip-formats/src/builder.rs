//! Callback traits driven by format parsers
//!
//! A parser never builds a module model itself. It reports what it finds to
//! a builder, so the same parse can feed a player, a statistics pass or
//! nothing at all.
//!
//! Every format defines its own `Builder` trait with [`PatternBuilder`] as a
//! supertrait and a [`MetaBuilder`] accessor. Patterns, lines and channels
//! are always started in ascending index order.

/// Module-wide text properties
pub trait MetaBuilder {
    fn set_program(&mut self, program: &str);
    fn set_title(&mut self, title: &str);
    fn set_author(&mut self, author: &str);
}

/// Pattern construction, in call order
///
/// `start_line` calls within a pattern, and `start_channel` calls within a
/// line, use strictly ascending indices. `finish` closes the pattern with
/// its final line count.
pub trait PatternBuilder {
    fn finish(&mut self, size: usize);
    fn start_line(&mut self, index: usize);
    fn start_channel(&mut self, index: usize);
    fn set_tempo(&mut self, tempo: u32);
}

/// Meta builder that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct StubMetaBuilder;

impl MetaBuilder for StubMetaBuilder {
    fn set_program(&mut self, _program: &str) {}
    fn set_title(&mut self, _title: &str) {}
    fn set_author(&mut self, _author: &str) {}
}

impl<T: MetaBuilder + ?Sized> MetaBuilder for &mut T {
    fn set_program(&mut self, program: &str) {
        (**self).set_program(program);
    }

    fn set_title(&mut self, title: &str) {
        (**self).set_title(title);
    }

    fn set_author(&mut self, author: &str) {
        (**self).set_author(author);
    }
}

impl<T: PatternBuilder + ?Sized> PatternBuilder for &mut T {
    fn finish(&mut self, size: usize) {
        (**self).finish(size);
    }

    fn start_line(&mut self, index: usize) {
        (**self).start_line(index);
    }

    fn start_channel(&mut self, index: usize) {
        (**self).start_channel(index);
    }

    fn set_tempo(&mut self, tempo: u32) {
        (**self).set_tempo(tempo);
    }
}

/// Expands a list of builder callback signatures into trait methods
///
/// - `stub`: bodies ignore every argument
/// - `deref`: bodies forward through `&mut T`
/// - `delegate`: bodies forward to the wrapped builder of a
///   [`StatisticCollectingBuilder`](crate::StatisticCollectingBuilder)
///
/// Format modules wrap their callback lists in a local macro and invoke it
/// once per builder implementation.
macro_rules! builder_methods {
    (stub; $(fn $name:ident(&mut self $(, $arg:ident: $ty:ty)*);)*) => {
        $(
            fn $name(&mut self $(, _: $ty)*) {}
        )*
    };
    (deref; $(fn $name:ident(&mut self $(, $arg:ident: $ty:ty)*);)*) => {
        $(
            fn $name(&mut self $(, $arg: $ty)*) {
                (**self).$name($($arg),*);
            }
        )*
    };
    (delegate; $(fn $name:ident(&mut self $(, $arg:ident: $ty:ty)*);)*) => {
        $(
            fn $name(&mut self $(, $arg: $ty)*) {
                self.delegate().$name($($arg),*);
            }
        )*
    };
}
pub(crate) use builder_methods;
