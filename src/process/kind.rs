// src/process/kind.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How the CSV loader should treat a column before normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnHint {
    /// Keep verbatim (identifiers such as phone numbers and zip codes).
    Text,
    /// Re-render numeric cells in float form, e.g. `20170304` → `20170304.0`.
    Float,
}

/// The five disclosure datasets published by the portal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Filer,
    Expense,
    Debt,
    Receipt,
    Contribution,
}

/// Column mapping and source details for one dataset kind.
#[derive(Debug)]
pub struct KindSpec {
    pub kind: DatasetKind,
    /// Socrata resource id under the portal's `api/views/`.
    pub resource_id: &'static str,
    pub file_name: &'static str,
    pub cache_key: &'static str,
    pub id_col: &'static str,
    pub date_col: Option<&'static str>,
    pub amount_col: Option<&'static str>,
    /// Prefix of `<prefix> Location 1/2` and `<prefix> Address 1` .. `<prefix> Zip Code`.
    pub prefix: &'static str,
    pub type_col: Option<&'static str>,
    pub geometry: bool,
    pub text_cols: &'static [&'static str],
}

const FILER_ID: &str = "Filer Identification Number";

static KIND_SPECS: [KindSpec; 5] = [
    KindSpec {
        kind: DatasetKind::Filer,
        resource_id: "53wp-ib3s",
        file_name: "Campaign_Finance_Disclosure_Filer_Data_Current_State.csv",
        cache_key: "filer",
        id_col: FILER_ID,
        date_col: None,
        amount_col: None,
        prefix: "Filer",
        type_col: Some("Filer Type"),
        geometry: true,
        text_cols: &["Phone Number"],
    },
    KindSpec {
        kind: DatasetKind::Expense,
        resource_id: "btk5-mx6k",
        file_name: "Campaign_Finance_Disclosure_Expense_Data_Current_State.csv",
        cache_key: "expense",
        id_col: FILER_ID,
        date_col: Some("Expense Date"),
        amount_col: Some("Expense Amount"),
        prefix: "Expense",
        type_col: None,
        geometry: true,
        text_cols: &[],
    },
    KindSpec {
        kind: DatasetKind::Debt,
        resource_id: "8bef-t5zg",
        file_name: "Campaign_Finance_Disclosure_Debt_Data_Current_State.csv",
        cache_key: "debt",
        id_col: FILER_ID,
        date_col: Some("Debt Accrual Date"),
        amount_col: Some("Debt Amount"),
        prefix: "Debt Reporting",
        type_col: None,
        geometry: true,
        text_cols: &[],
    },
    KindSpec {
        kind: DatasetKind::Receipt,
        resource_id: "w5um-i7zu",
        file_name: "Campaign_Finance_Disclosure_Receipt_Data_Current_State.csv",
        cache_key: "receipt",
        id_col: FILER_ID,
        date_col: Some("Receipt Date"),
        amount_col: Some("Receipt Amount"),
        prefix: "Receipt",
        type_col: None,
        geometry: true,
        text_cols: &[],
    },
    KindSpec {
        kind: DatasetKind::Contribution,
        resource_id: "wb79-wsa4",
        file_name: "Campaign_Finance_Disclosure_Contributions_Data_2017_State.csv",
        cache_key: "contrib",
        id_col: FILER_ID,
        date_col: Some("Contribution Date"),
        amount_col: Some("Contribution Amount"),
        prefix: "Contributor",
        type_col: None,
        geometry: true,
        text_cols: &["Employer Zip Code"],
    },
];

impl DatasetKind {
    pub const ALL: [DatasetKind; 5] = [
        DatasetKind::Filer,
        DatasetKind::Expense,
        DatasetKind::Debt,
        DatasetKind::Receipt,
        DatasetKind::Contribution,
    ];

    pub fn spec(self) -> &'static KindSpec {
        match self {
            DatasetKind::Filer => &KIND_SPECS[0],
            DatasetKind::Expense => &KIND_SPECS[1],
            DatasetKind::Debt => &KIND_SPECS[2],
            DatasetKind::Receipt => &KIND_SPECS[3],
            DatasetKind::Contribution => &KIND_SPECS[4],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Filer => "filer",
            DatasetKind::Expense => "expense",
            DatasetKind::Debt => "debt",
            DatasetKind::Receipt => "receipt",
            DatasetKind::Contribution => "contribution",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "filer" => Some(DatasetKind::Filer),
            "expense" => Some(DatasetKind::Expense),
            "debt" => Some(DatasetKind::Debt),
            "receipt" => Some(DatasetKind::Receipt),
            "contribution" | "contributions" | "contrib" => Some(DatasetKind::Contribution),
            _ => None,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl KindSpec {
    pub fn location_cols(&self) -> (String, String) {
        (
            format!("{} Location 1", self.prefix),
            format!("{} Location 2", self.prefix),
        )
    }

    /// Inclusive bounds of the address span, in source header order.
    pub fn address_bounds(&self) -> (String, String) {
        (
            format!("{} Address 1", self.prefix),
            format!("{} Zip Code", self.prefix),
        )
    }

    /// Loader hints: float storage for date and type codes, text for identifiers.
    pub fn column_hints(&self) -> HashMap<String, ColumnHint> {
        let mut hints = HashMap::new();
        for col in self.date_col.iter().chain(self.type_col.iter()) {
            hints.insert(col.to_string(), ColumnHint::Float);
        }
        for col in self.text_cols {
            hints.insert(col.to_string(), ColumnHint::Text);
        }
        hints
    }
}
