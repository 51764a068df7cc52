mod ids;
mod pool;
mod question;
mod quota;
mod usage;

pub use ids::{ParseIdError, QuestionId, SessionId};
pub use pool::{AttributeDomains, PoolError, QuestionPool};
pub use question::{Difficulty, Dimension, Question, QuestionError, normalize_label};
pub use quota::{QuotaError, QuotaPlan};
pub use usage::UsageState;
