use serde::{Deserialize, Serialize};

/// Operations gated by a minimum access level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    PlaceOrder,
    ManageOrder,
    DeleteOrder,
    RequestRefund,
    ReviewRefund,
    DeleteRefund,
    ManageRestock,
    DeleteRestock,
    ManageRemoval,
    DeleteRemoval,
    ManageInventory,
    ReadInventory,
    ReadLedger,
}

impl Operation {
    pub const ALL: [Operation; 13] = [
        Operation::PlaceOrder,
        Operation::ManageOrder,
        Operation::DeleteOrder,
        Operation::RequestRefund,
        Operation::ReviewRefund,
        Operation::DeleteRefund,
        Operation::ManageRestock,
        Operation::DeleteRestock,
        Operation::ManageRemoval,
        Operation::DeleteRemoval,
        Operation::ManageInventory,
        Operation::ReadInventory,
        Operation::ReadLedger,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::PlaceOrder => "place_order",
            Operation::ManageOrder => "manage_order",
            Operation::DeleteOrder => "delete_order",
            Operation::RequestRefund => "request_refund",
            Operation::ReviewRefund => "review_refund",
            Operation::DeleteRefund => "delete_refund",
            Operation::ManageRestock => "manage_restock",
            Operation::DeleteRestock => "delete_restock",
            Operation::ManageRemoval => "manage_removal",
            Operation::DeleteRemoval => "delete_removal",
            Operation::ManageInventory => "manage_inventory",
            Operation::ReadInventory => "read_inventory",
            Operation::ReadLedger => "read_ledger",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
