use crate::query::{ResultRow, Value};
use crate::shared::record::{row, TableRecord};
use serde::{Deserialize, Serialize};

/// Json path of the installment list inside a payment history document
pub const INSTALLMENTS_PATH: [&str; 2] = ["installments", "payments"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    /// Due date of the installment
    pub timestamp: i64,
    pub price: f64,
    /// `1` once the installment was paid
    pub paid: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub payments: Vec<Installment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct PaymentDocument {
    installments: InstallmentPlan,
}

/// Entry of the payment history written by the shopping cart when a user
/// buys an option in installments
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentHistory {
    pub id: i64,
    pub optionid: i64,
    pub userid: i64,
    pub json: String,
}

impl PaymentHistory {
    pub fn new(id: i64, optionid: i64, userid: i64, plan: InstallmentPlan) -> Self {
        let json = serde_json::to_string(&PaymentDocument { installments: plan })
            .unwrap_or_else(|_| "{}".to_string());
        Self {
            id,
            optionid,
            userid,
            json,
        }
    }

    pub fn plan(&self) -> Option<InstallmentPlan> {
        serde_json::from_str::<PaymentDocument>(&self.json)
            .ok()
            .map(|doc| doc.installments)
    }
}

impl TableRecord for PaymentHistory {
    const TABLE: &'static str = "booking_payment_history";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> ResultRow {
        row(vec![
            ("id", Value::Int(self.id)),
            ("optionid", self.optionid.into()),
            ("userid", self.userid.into()),
            ("json", self.json.as_str().into()),
        ])
    }
}
