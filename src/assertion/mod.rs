/// 断言模块 - 部分匹配引擎与内置匹配器
mod extract;
mod matchers;
mod pattern;

pub use extract::{SaveEntry, lookup, save_from_json};
pub use matchers::{AnyOf, Contains, Gt, Gte, Length, Lt, Lte, MatchError, Matcher, Matches, NotEmpty};
pub use pattern::{BodyExpect, Pattern, partial_match};
