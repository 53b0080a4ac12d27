use geo_types::Coord;

/// Conversion of a point from one coordinate space into another.
///
/// `project` goes from the input space into the output space, `unproject` goes back. Both return `None` if the point
/// is outside of the domain of the conversion.
pub trait Projection {
    /// Point type of the source space.
    type InPoint;
    /// Point type of the target space.
    type OutPoint;

    /// Converts the point into the target space.
    fn project(&self, input: &Self::InPoint) -> Option<Self::OutPoint>;
    /// Converts the point from the target space back into the source space.
    fn unproject(&self, input: &Self::OutPoint) -> Option<Self::InPoint>;
}

/// Projection between two coordinate systems that both store points as `geo_types` coordinates.
pub type CoordProjection = dyn Projection<InPoint = Coord<f64>, OutPoint = Coord<f64>>;

/// Projection that applies two projections one after another.
pub struct ChainProjection<In, Mid, Out> {
    first: Box<dyn Projection<InPoint = In, OutPoint = Mid>>,
    second: Box<dyn Projection<InPoint = Mid, OutPoint = Out>>,
}

impl<In, Mid, Out> ChainProjection<In, Mid, Out> {
    /// Creates a projection that applies `first` and then `second`.
    pub fn new(
        first: Box<dyn Projection<InPoint = In, OutPoint = Mid>>,
        second: Box<dyn Projection<InPoint = Mid, OutPoint = Out>>,
    ) -> Self {
        Self { first, second }
    }
}

impl<In, Mid, Out> Projection for ChainProjection<In, Mid, Out> {
    type InPoint = In;
    type OutPoint = Out;

    fn project(&self, input: &In) -> Option<Out> {
        self.second.project(&self.first.project(input)?)
    }

    fn unproject(&self, input: &Out) -> Option<In> {
        self.first.unproject(&self.second.unproject(input)?)
    }
}

/// Projection that swaps the direction of the inner projection.
pub struct InvertedProjection<In, Out> {
    inner: Box<dyn Projection<InPoint = Out, OutPoint = In>>,
}

impl<In, Out> InvertedProjection<In, Out> {
    /// Wraps the given projection.
    pub fn new(inner: Box<dyn Projection<InPoint = Out, OutPoint = In>>) -> Self {
        Self { inner }
    }
}

impl<In, Out> Projection for InvertedProjection<In, Out> {
    type InPoint = In;
    type OutPoint = Out;

    fn project(&self, input: &In) -> Option<Out> {
        self.inner.unproject(input)
    }

    fn unproject(&self, input: &Out) -> Option<In> {
        self.inner.project(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shift(f64);

    impl Projection for Shift {
        type InPoint = Coord<f64>;
        type OutPoint = Coord<f64>;

        fn project(&self, input: &Coord<f64>) -> Option<Coord<f64>> {
            Some(Coord {
                x: input.x + self.0,
                y: input.y,
            })
        }

        fn unproject(&self, input: &Coord<f64>) -> Option<Coord<f64>> {
            Some(Coord {
                x: input.x - self.0,
                y: input.y,
            })
        }
    }

    #[test]
    fn chain_applies_in_order() {
        let chain = ChainProjection::new(Box::new(Shift(1.0)), Box::new(Shift(10.0)));
        let out = chain.project(&Coord { x: 0.0, y: 5.0 }).unwrap();
        assert_eq!(out, Coord { x: 11.0, y: 5.0 });
        assert_eq!(chain.unproject(&out).unwrap(), Coord { x: 0.0, y: 5.0 });
    }

    #[test]
    fn inverted_swaps_direction() {
        let inverted = InvertedProjection::new(Box::new(Shift(3.0)));
        assert_eq!(
            inverted.project(&Coord { x: 3.0, y: 1.0 }).unwrap(),
            Coord { x: 0.0, y: 1.0 }
        );
    }
}
