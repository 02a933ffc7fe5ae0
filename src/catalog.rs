//! Series catalog
//!
//! The allow-list of FRED indicators the service may query. A [`SeriesId`]
//! can only be obtained through [`SeriesCatalog::lookup`], so anything that
//! holds one has already passed the allow-list check.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesEntry {
    pub id: &'static str,
    pub title: &'static str,
    pub hints: &'static [&'static str],
}

/// Static indicator table — zero allocation
const DEFAULT_ENTRIES: &[SeriesEntry] = &[
    // Rates
    SeriesEntry { id: "MORTGAGE30US", title: "30-Year Fixed Rate Mortgage Average", hints: &["30-year mortgage", "mortgage rate", "home loan rate"] },
    SeriesEntry { id: "MORTGAGE15US", title: "15-Year Fixed Rate Mortgage Average", hints: &["15-year mortgage"] },
    SeriesEntry { id: "FEDFUNDS", title: "Federal Funds Effective Rate (monthly)", hints: &["fed funds", "interest rate", "fed rate"] },
    SeriesEntry { id: "DFF", title: "Federal Funds Effective Rate (daily)", hints: &["daily fed funds"] },
    SeriesEntry { id: "DGS10", title: "10-Year Treasury Constant Maturity Rate", hints: &["10-year treasury", "10 year yield"] },
    SeriesEntry { id: "DGS2", title: "2-Year Treasury Constant Maturity Rate", hints: &["2-year treasury", "2 year yield"] },
    SeriesEntry { id: "T10Y2Y", title: "10-Year Minus 2-Year Treasury Spread", hints: &["yield curve", "yield spread", "inversion"] },
    // Prices
    SeriesEntry { id: "CPIAUCSL", title: "Consumer Price Index for All Urban Consumers", hints: &["inflation", "cpi", "consumer prices"] },
    SeriesEntry { id: "CPILFESL", title: "CPI Less Food and Energy", hints: &["core inflation", "core cpi"] },
    SeriesEntry { id: "PCEPI", title: "Personal Consumption Expenditures Price Index", hints: &["pce", "pce inflation"] },
    SeriesEntry { id: "PCEPILFE", title: "PCE Excluding Food and Energy", hints: &["core pce"] },
    SeriesEntry { id: "CSUSHPINSA", title: "S&P CoreLogic Case-Shiller U.S. National Home Price Index", hints: &["home prices", "house prices", "case-shiller"] },
    // Labour
    SeriesEntry { id: "UNRATE", title: "Unemployment Rate", hints: &["unemployment", "jobless rate"] },
    SeriesEntry { id: "PAYEMS", title: "All Employees, Total Nonfarm", hints: &["payrolls", "jobs", "nonfarm employment"] },
    SeriesEntry { id: "ICSA", title: "Initial Claims", hints: &["jobless claims", "unemployment claims"] },
    // Output & activity
    SeriesEntry { id: "GDP", title: "Gross Domestic Product", hints: &["gdp", "nominal gdp", "economic output"] },
    SeriesEntry { id: "GDPC1", title: "Real Gross Domestic Product", hints: &["real gdp", "economic growth"] },
    SeriesEntry { id: "INDPRO", title: "Industrial Production: Total Index", hints: &["industrial production", "manufacturing output"] },
    SeriesEntry { id: "RSAFS", title: "Advance Retail Sales: Retail Trade and Food Services", hints: &["retail sales", "consumer spending"] },
    SeriesEntry { id: "HOUST", title: "New Privately-Owned Housing Units Started", hints: &["housing starts"] },
    // Money & sentiment
    SeriesEntry { id: "M2SL", title: "M2 Money Stock", hints: &["money supply", "m2"] },
    SeriesEntry { id: "UMCSENT", title: "University of Michigan: Consumer Sentiment", hints: &["consumer sentiment", "consumer confidence"] },
    SeriesEntry { id: "VIXCLS", title: "CBOE Volatility Index: VIX", hints: &["vix", "volatility"] },
];

/// An identifier that is known to be in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SeriesId(String);

impl SeriesId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Official FRED page for this series
    pub fn source_url(&self) -> String {
        format!("https://fred.stlouisfed.org/series/{}", self.0)
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct SeriesCatalog {
    entries: Vec<SeriesEntry>,
}

impl SeriesCatalog {
    pub fn new(entries: Vec<SeriesEntry>) -> Self {
        Self { entries }
    }

    /// Validate a raw identifier (case-insensitive) against the allow-list.
    pub fn lookup(&self, raw: &str) -> Option<SeriesId> {
        let wanted = raw.trim();
        self.entries
            .iter()
            .find(|e| e.id.eq_ignore_ascii_case(wanted))
            .map(|e| SeriesId(e.id.to_string()))
    }

    pub fn entries(&self) -> &[SeriesEntry] {
        &self.entries
    }

    /// One line per indicator, for the resolver prompt.
    pub fn prompt_listing(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("- {}: {} ({})", e.id, e.title, e.hints.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for SeriesCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRIES.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = SeriesCatalog::default();
        let id = catalog.lookup(" mortgage30us ").unwrap();
        assert_eq!(id.as_str(), "MORTGAGE30US");
        assert_eq!(
            id.source_url(),
            "https://fred.stlouisfed.org/series/MORTGAGE30US"
        );
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let catalog = SeriesCatalog::default();
        for raw in ["", "NONE", "SP500", "UNRATE; DROP", "../series"] {
            assert!(catalog.lookup(raw).is_none(), "{} should be rejected", raw);
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let catalog = SeriesCatalog::default();
        let mut ids: Vec<_> = catalog.entries().iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog.entries().len());
    }

    #[test]
    fn test_prompt_listing_names_every_series() {
        let catalog = SeriesCatalog::default();
        let listing = catalog.prompt_listing();
        for entry in catalog.entries() {
            assert!(listing.contains(entry.id));
        }
    }
}
