//! Schema context — the static description of the orders fact table that
//! the translator embeds in every generation instruction.
//!
//! Read-only after process start; bump `version` when the mart changes so
//! stale prompt text is easy to spot in logs.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SchemaColumn {
    pub name: &'static str,
    pub meaning: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaContext {
    pub version: u32,
    pub table: &'static str,
    pub columns: Vec<SchemaColumn>,
    pub guidance: Vec<&'static str>,
}

impl SchemaContext {
    /// The orders mart every analytical query aggregates over.
    pub fn fct_orders() -> Self {
        Self {
            version: 1,
            table: "fct_orders",
            columns: vec![
                SchemaColumn { name: "order_id", meaning: "unique order line identifier" },
                SchemaColumn { name: "order_date", meaning: "date the order was placed" },
                SchemaColumn { name: "customer_id", meaning: "customer identifier" },
                SchemaColumn { name: "customer_name", meaning: "customer display name" },
                SchemaColumn { name: "customer_segment", meaning: "segment (Enterprise, SMB, ...)" },
                SchemaColumn { name: "industry", meaning: "customer industry" },
                SchemaColumn { name: "product_id", meaning: "product identifier" },
                SchemaColumn { name: "product_name", meaning: "product display name" },
                SchemaColumn { name: "category", meaning: "product category" },
                SchemaColumn { name: "subcategory", meaning: "product subcategory" },
                SchemaColumn { name: "sales_rep_id", meaning: "sales rep identifier" },
                SchemaColumn { name: "rep_name", meaning: "sales rep display name" },
                SchemaColumn { name: "order_region", meaning: "region the order was placed in" },
                SchemaColumn { name: "quantity", meaning: "units sold on the line" },
                SchemaColumn { name: "unit_price", meaning: "list price per unit" },
                SchemaColumn { name: "discount_pct", meaning: "discount percentage applied" },
                SchemaColumn { name: "gross_amount", meaning: "revenue before discount" },
                SchemaColumn { name: "net_amount", meaning: "revenue after discount" },
                SchemaColumn { name: "discount_amount", meaning: "discount value in currency" },
                SchemaColumn { name: "order_week", meaning: "ISO week of order_date" },
                SchemaColumn { name: "order_month", meaning: "calendar month of order_date" },
                SchemaColumn { name: "order_quarter", meaning: "calendar quarter of order_date" },
                SchemaColumn { name: "order_year", meaning: "calendar year of order_date" },
            ],
            guidance: vec![
                "For revenue, use net_amount (after discounts).",
                "Dates are SQL DATE values; compare with date literals like DATE '2025-01-01'.",
            ],
        }
    }

    /// Render the schema section of the generation instruction.
    pub fn prompt_block(&self) -> String {
        let mut block = format!("The data is in {} with columns:\n", self.table);
        for col in &self.columns {
            block.push_str(&format!("- {} = {}\n", col.name, col.meaning));
        }
        for note in &self.guidance {
            block.push('\n');
            block.push_str(note);
        }
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_block_lists_table_and_revenue_guidance() {
        let schema = SchemaContext::fct_orders();
        let block = schema.prompt_block();

        assert!(block.starts_with("The data is in fct_orders"));
        assert!(block.contains("- net_amount = revenue after discount"));
        assert!(block.contains("For revenue, use net_amount (after discounts)."));
    }
}
