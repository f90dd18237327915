use chrono::{DateTime, Duration, Utc};

use super::types::{Constraint, FilterType, Operator, QueryParams};
use crate::optimus::Optimus;

/// Id that can never exist. Undecodable ids filter to an empty result instead of failing.
pub const IMPOSSIBLE_ID: i64 = -1;

const TRUTHY: [&str; 3] = ["true", "1", "t"];

pub struct FilterWhere;

impl FilterWhere {
    /// Turn request query parameters into constraints for the declared filterable keys.
    ///
    /// Keys are matched after rewriting `:` to `.`, so `creator:name` filters on the
    /// `creator` relation. Keys that are not filterable are ignored.
    pub fn constraints(
        params: &QueryParams,
        filterable: &[(&str, FilterType)],
        optimus: &Optimus,
    ) -> Vec<Constraint> {
        let mut constraints = Vec::new();
        for (raw_key, raw_value) in params {
            let key = raw_key.replace(':', ".");
            let Some((column, filter_type)) = filterable.iter().find(|(name, _)| *name == key) else {
                continue;
            };

            let value = raw_value.trim();
            match filter_type {
                FilterType::Date => constraints.extend(Self::date_range(column, value)),
                FilterType::Boolean => {
                    let truthy = TRUTHY.contains(&value.to_ascii_lowercase().as_str());
                    constraints.push(Constraint::eq(*column, truthy));
                }
                FilterType::Integer => {
                    if let Ok(number) = value.parse::<i64>() {
                        constraints.push(Constraint::eq(*column, number));
                    }
                }
                FilterType::Decoded => {
                    constraints.push(Constraint::eq(*column, Self::decode(value, optimus)));
                }
                FilterType::String => {
                    if value.contains('*') {
                        constraints.push(Constraint::new(*column, Operator::ILike, value.replace('*', "%")));
                    } else {
                        constraints.push(Constraint::eq(*column, value));
                    }
                }
            }
        }

        if crate::config::config().filter.debug_logging && !constraints.is_empty() {
            tracing::debug!(?constraints, "Query string constraints");
        }
        constraints
    }

    fn decode(value: &str, optimus: &Optimus) -> i64 {
        optimus.decode_str(value).unwrap_or(IMPOSSIBLE_ID)
    }

    /// `from,to` unix timestamps (either side optional); a single value covers that whole day.
    fn date_range(column: &str, value: &str) -> Vec<Constraint> {
        let parse = |s: &str| -> Option<DateTime<Utc>> {
            s.trim().parse::<i64>().ok().and_then(|ts| DateTime::from_timestamp(ts, 0))
        };

        match value.split_once(',') {
            Some((from, to)) => match (parse(from), parse(to)) {
                (Some(from), Some(to)) => vec![Constraint::between(column, from, to)],
                (Some(from), None) => vec![Constraint::new(column, Operator::Gte, from)],
                (None, Some(to)) => vec![Constraint::new(column, Operator::Lte, to)],
                (None, None) => vec![],
            },
            None => match parse(value) {
                Some(at) => {
                    let start = at
                        .date_naive()
                        .and_hms_opt(0, 0, 0)
                        .map(|naive| naive.and_utc())
                        .unwrap_or(at);
                    let end = start + Duration::days(1) - Duration::seconds(1);
                    vec![Constraint::between(column, start, end)]
                }
                None => vec![],
            },
        }
    }
}
