use std::marker::PhantomData;

use crate::geo::traits::projection::Projection;

/// Projection that returns the input point unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityProjection<P> {
    phantom: PhantomData<P>,
}

impl<P> IdentityProjection<P> {
    /// Creates a new instance.
    pub fn new() -> Self {
        Self {
            phantom: Default::default(),
        }
    }
}

impl<P: Copy> Projection for IdentityProjection<P> {
    type InPoint = P;
    type OutPoint = P;

    fn project(&self, input: &P) -> Option<P> {
        Some(*input)
    }

    fn unproject(&self, input: &P) -> Option<P> {
        Some(*input)
    }
}
