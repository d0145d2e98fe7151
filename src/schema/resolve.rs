//! Column discovery across spreadsheet vintages.
//!
//! Each canonical field carries an ordered list of strategies. They are tried
//! in order against the sheet's headers and the first hit is kept together
//! with the strategy that produced it, so a log line can say *how* a column
//! was found instead of leaving it to guesswork.

use tracing::{debug, warn};

use super::types::{ColumnRule, Strategy, TableSchema};

/// Which strategy located the source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Exact,
    Variant(String),
    Pattern(String),
    Unresolved,
}

/// Outcome of resolving one canonical field against one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub field: String,
    /// Position of the source column in the sheet's header row.
    pub index: Option<usize>,
    pub header: Option<String>,
    pub how: Resolved,
}

/// Resolve `rule` against already-lowercased headers.
pub fn resolve_rule(rule: &ColumnRule, headers_lower: &[String]) -> (Option<usize>, Resolved) {
    let position = |name: &str| {
        let name = name.trim().to_lowercase();
        headers_lower.iter().position(|h| *h == name)
    };

    for strategy in rule.strategies() {
        match strategy {
            Strategy::Exact(name) => {
                if let Some(i) = position(name) {
                    return (Some(i), Resolved::Exact);
                }
            }
            Strategy::Variant(names) => {
                for name in names {
                    if let Some(i) = position(name) {
                        return (Some(i), Resolved::Variant(name.clone()));
                    }
                }
            }
            Strategy::Pattern {
                candidates,
                exclude,
            } => {
                let exclude: Vec<String> = exclude.iter().map(|e| e.to_lowercase()).collect();
                for candidate in candidates {
                    let needle = candidate.to_lowercase();
                    let hit = headers_lower.iter().position(|h| {
                        h.contains(&needle) && !exclude.iter().any(|e| h.contains(e.as_str()))
                    });
                    if let Some(i) = hit {
                        return (Some(i), Resolved::Pattern(candidate.clone()));
                    }
                }
            }
        }
    }
    (None, Resolved::Unresolved)
}

/// Resolve every sheet-sourced column of `schema`. Provenance columns map to `None`.
pub fn resolve_columns(
    schema: &TableSchema,
    sheet_name: &str,
    headers: &[String],
) -> Vec<Option<Resolution>> {
    let headers_lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    schema
        .columns()
        .iter()
        .map(|col| {
            let rule = col.rule()?;
            let (index, how) = resolve_rule(rule, &headers_lower);
            let header = index.map(|i| headers[i].clone());
            match &how {
                Resolved::Unresolved => {
                    warn!(sheet = sheet_name, field = %col.name, "no source column; field will be null")
                }
                how => {
                    debug!(sheet = sheet_name, field = %col.name, header = ?header, strategy = ?how, "resolved")
                }
            }
            Some(Resolution {
                field: col.name.clone(),
                index,
                header,
                how,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::ColumnDef;

    fn lower(headers: &[&str]) -> Vec<String> {
        headers.iter().map(|h| h.to_lowercase()).collect()
    }

    #[test]
    fn exact_is_case_insensitive() {
        let headers = lower(&["fips", "County_Name", "stusps"]);
        let (idx, how) = resolve_rule(&ColumnRule::exact("county_name"), &headers);
        assert_eq!(idx, Some(1));
        assert_eq!(how, Resolved::Exact);
    }

    #[test]
    fn variant_falls_back_in_order() {
        let rule = ColumnRule::exact("pop2020").then_variants(["pop2022"]);
        let headers = lower(&["fips", "pop2022"]);
        assert_eq!(
            resolve_rule(&rule, &headers),
            (Some(1), Resolved::Variant("pop2022".into()))
        );
    }

    #[test]
    fn pattern_takes_first_candidate_then_first_header() {
        let rule = ColumnRule::pattern(["Overall Homeless - Under 18", "Overall Homeless"]);
        let headers = lower(&[
            "CoC Number",
            "Overall Homeless, 2015",
            "Overall Homeless - Under 18, 2015",
        ]);
        assert_eq!(
            resolve_rule(&rule, &headers),
            (
                Some(2),
                Resolved::Pattern("Overall Homeless - Under 18".into())
            )
        );
    }

    #[test]
    fn pattern_exclusion_skips_unsheltered() {
        let rule = ColumnRule::pattern(["Sheltered"]).excluding(["Unsheltered"]);
        let headers = lower(&["Unsheltered Homeless, 2010", "Sheltered Homeless, 2010"]);
        assert_eq!(resolve_rule(&rule, &headers).0, Some(1));
    }

    #[test]
    fn missing_everything_is_unresolved() {
        let rule = ColumnRule::exact("pop2020").then_variants(["pop2022"]);
        assert_eq!(
            resolve_rule(&rule, &lower(&["fips"])),
            (None, Resolved::Unresolved)
        );
    }

    #[test]
    fn provenance_columns_are_not_resolved() {
        let schema = TableSchema::new(vec![
            ColumnDef::text("fips", ColumnRule::exact("fips")),
            ColumnDef::year("fiscal_year"),
        ]);
        let out = resolve_columns(&schema, "sheet1", &["FIPS".to_string()]);
        assert_eq!(out[0].as_ref().map(|r| r.index), Some(Some(0)));
        assert_eq!(out[0].as_ref().and_then(|r| r.header.clone()), Some("FIPS".into()));
        assert!(out[1].is_none());
    }
}
