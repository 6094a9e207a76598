mod grouped_mean;

pub use grouped_mean::GroupedMean;
