/// Модуль предобработки данных

pub mod duration;
pub mod encoding;
pub mod feature_engineering;
pub mod missing;
pub mod numeric;

pub use duration::parse_duration;
pub use encoding::{CategoricalEncoder, EncodingStrategy, OrdinalEncoder, TargetEncoder};
pub use feature_engineering::{FeatureEngineer, ModelingData};
pub use missing::{MissingValuePolicy, NOT_INFORMED, ZERO_PERCENT};
pub use numeric::{parse_number, parse_percentage};
