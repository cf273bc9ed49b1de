//! Composable wrappers around request handlers.
//!
//! Every middleware in this crate is a [`Decorator`] that takes a handler and
//! returns a new handler wrapping it. Decorators chain with
//! [`DecoratorExt::and_then`]: in `a.and_then(b)` the handler produced by `a` is
//! wrapped by `b`, so `b` sees the request first.

pub trait Decorator<In> {
    type Out;

    fn decorate(&self, raw: In) -> Self::Out;
}

// not tied to an input type: most decorators accept any handler, so the input is
// only known once the finished chain is applied
pub trait DecoratorExt: Sized {
    fn and_then<D>(self, decorator: D) -> DecoratorComposer<Self, D> {
        DecoratorComposer::new(self, decorator)
    }
}

impl<T> DecoratorExt for T {}

/// Passes the handler through untouched; the starting point of a chain.
#[derive(Default, Clone, Copy, Debug)]
pub struct IdentityDecorator;

impl<In> Decorator<In> for IdentityDecorator {
    type Out = In;

    #[inline]
    fn decorate(&self, raw: In) -> Self::Out {
        raw
    }
}

/// `decorator_1` applied first, its output wrapped by `decorator_2`.
#[derive(Debug, Clone, Copy)]
pub struct DecoratorComposer<D1, D2> {
    decorator_1: D1,
    decorator_2: D2,
}

impl<D1, D2> DecoratorComposer<D1, D2> {
    pub fn new(decorator_1: D1, decorator_2: D2) -> Self {
        Self { decorator_1, decorator_2 }
    }
}

impl<In, D1, D2> Decorator<In> for DecoratorComposer<D1, D2>
where
    D1: Decorator<In>,
    D2: Decorator<D1::Out>,
{
    type Out = D2::Out;

    fn decorate(&self, raw: In) -> Self::Out {
        let inner = self.decorator_1.decorate(raw);
        self.decorator_2.decorate(inner)
    }
}
