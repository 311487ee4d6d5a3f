/// Convert to and from the vector of triplets
pub trait MatTriplets {
    type Mat;
    type Scalar;

    fn from_nonzero_triplets<I>(
        nrow: usize,
        ncol: usize,
        triplets: Vec<(I, I, Self::Scalar)>,
    ) -> anyhow::Result<Self::Mat>
    where
        I: TryInto<usize> + Copy,
        <I as TryInto<usize>>::Error: std::fmt::Debug;

    fn to_nonzero_triplets(&self) -> (usize, usize, Vec<(usize, usize, Self::Scalar)>);
}

/// Dense matrices stored row-major behind a `nrow ncol` header line
/// so that the shape survives empty rows and columns.
pub trait DimIoOps {
    type Mat;

    fn write_with_dims(&self, file: &str) -> anyhow::Result<()>;

    fn read_with_dims(file: &str) -> anyhow::Result<Self::Mat>;
}
