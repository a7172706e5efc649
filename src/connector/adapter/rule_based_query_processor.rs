use std::collections::HashMap;

use crate::application::{ProcessedQuery, QueryProcessor};
use crate::domain::DomainError;

/// Curated abbreviation table expanding common short forms into the terms
/// they likely stand for in source code (§4.5's "FTS query construction
/// contract"). Ordered roughly by domain; entries map one abbreviation to
/// one or more expansions.
const ABBREVIATIONS: &[(&str, &[&str])] = &[
    ("alloc", &["allocate", "allocation"]),
    ("dealloc", &["deallocate", "deallocation"]),
    ("mem", &["memory"]),
    ("kalloc", &["kernel_allocate"]),
    ("kfree", &["kernel_free"]),
    ("ctx", &["context"]),
    ("cfg", &["config", "configuration"]),
    ("config", &["configuration"]),
    ("init", &["initialize", "initialization"]),
    ("impl", &["implementation"]),
    ("fn", &["function"]),
    ("func", &["function"]),
    ("arg", &["argument"]),
    ("args", &["arguments"]),
    ("param", &["parameter"]),
    ("params", &["parameters"]),
    ("ret", &["return"]),
    ("err", &["error"]),
    ("errs", &["errors"]),
    ("msg", &["message"]),
    ("req", &["request"]),
    ("res", &["response", "result"]),
    ("resp", &["response"]),
    ("auth", &["authentication", "authorization"]),
    ("authn", &["authentication"]),
    ("authz", &["authorization"]),
    ("db", &["database"]),
    ("conn", &["connection"]),
    ("sync", &["synchronize", "synchronous"]),
    ("async", &["asynchronous"]),
    ("concur", &["concurrent", "concurrency"]),
    ("repo", &["repository"]),
    ("dir", &["directory"]),
    ("env", &["environment"]),
    ("var", &["variable"]),
    ("vars", &["variables"]),
    ("idx", &["index"]),
    ("len", &["length"]),
    ("num", &["number"]),
    ("str", &["string"]),
    ("buf", &["buffer"]),
    ("ptr", &["pointer"]),
    ("ref", &["reference"]),
    ("refs", &["references"]),
    ("struct", &["structure"]),
    ("impl", &["implementation"]),
    ("iface", &["interface"]),
    ("pkg", &["package"]),
    ("mod", &["module"]),
    ("lib", &["library"]),
    ("util", &["utility", "utilities"]),
    ("utils", &["utilities"]),
    ("misc", &["miscellaneous"]),
    ("tmp", &["temporary"]),
    ("temp", &["temporary"]),
    ("prev", &["previous"]),
    ("curr", &["current"]),
    ("cur", &["current"]),
    ("min", &["minimum"]),
    ("max", &["maximum"]),
    ("avg", &["average"]),
    ("calc", &["calculate", "calculation"]),
    ("eval", &["evaluate", "evaluation"]),
    ("exec", &["execute", "execution"]),
    ("proc", &["process"]),
    ("thread", &["threading"]),
    ("sched", &["scheduler", "schedule"]),
    ("queue", &["queueing"]),
    ("svc", &["service"]),
    ("srv", &["server"]),
    ("cli", &["client"]),
    ("mgr", &["manager"]),
    ("admin", &["administrator", "administration"]),
    ("perm", &["permission"]),
    ("perms", &["permissions"]),
    ("usr", &["user"]),
    ("pwd", &["password"]),
    ("addr", &["address"]),
    ("net", &["network"]),
    ("pkt", &["packet"]),
    ("sock", &["socket"]),
    ("hdr", &["header"]),
    ("meta", &["metadata"]),
];

/// Splits tokens by camelCase and snake_case boundaries and expands known
/// abbreviations into a disjunctive FTS5 prefix-match expression.
pub struct RuleBasedQueryProcessor {
    abbreviations: HashMap<&'static str, &'static [&'static str]>,
}

impl RuleBasedQueryProcessor {
    pub fn new() -> Self {
        Self {
            abbreviations: ABBREVIATIONS.iter().copied().collect(),
        }
    }

    fn split_camel_case(token: &str) -> Vec<String> {
        let mut parts = Vec::new();
        let mut current = String::new();
        for ch in token.chars() {
            if ch.is_uppercase() && !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            current.push(ch.to_ascii_lowercase());
        }
        if !current.is_empty() {
            parts.push(current);
        }
        parts
    }

    /// Strips punctuation but preserves case, so camelCase boundaries are
    /// still visible to `split_camel_case` afterwards.
    fn strip_punctuation(token: &str) -> String {
        token
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect()
    }

    fn clean(token: &str) -> String {
        Self::strip_punctuation(token).to_lowercase()
    }
}

impl Default for RuleBasedQueryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryProcessor for RuleBasedQueryProcessor {
    fn process(&self, query: &str) -> Result<ProcessedQuery, DomainError> {
        let raw_tokens: Vec<&str> = query.split_whitespace().collect();
        if raw_tokens.len() == 1 && Self::clean(raw_tokens[0]).len() <= 2 {
            return Err(DomainError::query_validation(
                "query is too short to search meaningfully",
            ));
        }
        if raw_tokens.is_empty() {
            return Err(DomainError::query_validation("query must not be empty"));
        }

        let mut terms: Vec<String> = Vec::new();
        for raw in raw_tokens {
            let case_preserved = Self::strip_punctuation(raw);
            if case_preserved.is_empty() {
                continue;
            }
            let cleaned = case_preserved.to_lowercase();
            terms.push(cleaned.clone());

            // Split on snake_case first (case-insensitive), then camelCase on
            // each original-case part — camelCase boundaries only survive if
            // we split before lowercasing the token (§4.5: `fooBar` → `foo`,
            // `bar`, `fooBar`).
            for snake_part in case_preserved.split('_').filter(|p| !p.is_empty()) {
                let snake_lower = snake_part.to_lowercase();
                if snake_lower != cleaned {
                    terms.push(snake_lower.clone());
                }
                for camel_part in Self::split_camel_case(snake_part) {
                    if camel_part != snake_lower {
                        terms.push(camel_part);
                    }
                }
            }

            if let Some(expansions) = self.abbreviations.get(cleaned.as_str()) {
                for expansion in *expansions {
                    terms.push(expansion.to_string());
                }
            }
        }

        terms.sort();
        terms.dedup();

        if terms.is_empty() {
            return Err(DomainError::query_validation("query has no searchable terms"));
        }

        let fts_expression = terms
            .iter()
            .map(|t| format!("{t}*"))
            .collect::<Vec<_>>()
            .join(" OR ");

        Ok(ProcessedQuery {
            terms,
            fts_expression,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_single_token_query_is_rejected() {
        let processor = RuleBasedQueryProcessor::new();
        assert!(processor.process("ab").is_err());
    }

    #[test]
    fn multi_word_short_queries_are_accepted() {
        let processor = RuleBasedQueryProcessor::new();
        assert!(processor.process("db ok").is_ok());
    }

    #[test]
    fn camel_case_is_split() {
        let processor = RuleBasedQueryProcessor::new();
        let processed = processor.process("fooBar handler").unwrap();
        assert!(processed.terms.contains(&"foo".to_string()));
        assert!(processed.terms.contains(&"bar".to_string()));
        assert!(processed.terms.contains(&"foobar".to_string()));
    }

    #[test]
    fn snake_case_is_split() {
        let processor = RuleBasedQueryProcessor::new();
        let processed = processor.process("foo_bar handler").unwrap();
        assert!(processed.terms.contains(&"foo".to_string()));
        assert!(processed.terms.contains(&"bar".to_string()));
    }

    #[test]
    fn abbreviations_expand() {
        let processor = RuleBasedQueryProcessor::new();
        let processed = processor.process("kalloc routine").unwrap();
        assert!(processed.terms.contains(&"kernel_allocate".to_string()));
    }

    #[test]
    fn expression_is_disjunctive_with_prefix_stars() {
        let processor = RuleBasedQueryProcessor::new();
        let processed = processor.process("memory handler").unwrap();
        assert!(processed.fts_expression.contains(" OR "));
        assert!(processed.fts_expression.contains("memory*"));
    }
}
