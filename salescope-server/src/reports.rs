//! Canned dashboard reports — the named, parameterized queries behind the
//! KPI cards, trend charts and leaderboards.
//!
//! Every report takes exactly one date range, bound as $1/$2 (never
//! interpolated into the statement), and runs through the shared result
//! cache under its own fingerprint. The caller validates date ordering
//! before the range reaches this layer.

use std::time::Duration;

use chrono::NaiveDate;
use salescope_core::executor::{ExecutionError, QueryExecutor};
use salescope_core::models::{CellValue, QueryResult};
use salescope_core::ResultCache;

pub struct CannedReport {
    pub name: &'static str,
    pub sql: &'static str,
}

pub const REPORTS: &[CannedReport] = &[
    CannedReport {
        name: "kpi_summary",
        sql: "
            SELECT
                SUM(net_amount) AS total_revenue,
                SUM(gross_amount) AS gross_revenue,
                SUM(discount_amount) AS total_discounts,
                COUNT(*) AS order_count,
                COUNT(DISTINCT customer_id) AS customer_count,
                SUM(quantity) AS units_sold,
                AVG(net_amount) AS avg_order_value
            FROM fct_orders
            WHERE order_date BETWEEN $1 AND $2
        ",
    },
    CannedReport {
        name: "daily_trend",
        sql: "
            SELECT
                order_date,
                SUM(net_amount) AS revenue,
                COUNT(*) AS orders
            FROM fct_orders
            WHERE order_date BETWEEN $1 AND $2
            GROUP BY order_date
            ORDER BY order_date
        ",
    },
    CannedReport {
        name: "region_breakdown",
        sql: "
            SELECT
                order_region AS region,
                SUM(net_amount) AS revenue,
                COUNT(*) AS orders
            FROM fct_orders
            WHERE order_date BETWEEN $1 AND $2
            GROUP BY order_region
            ORDER BY revenue DESC
        ",
    },
    CannedReport {
        name: "category_breakdown",
        sql: "
            SELECT
                category,
                SUM(net_amount) AS total_revenue,
                SUM(quantity) AS units_sold,
                COUNT(*) AS orders
            FROM fct_orders
            WHERE order_date BETWEEN $1 AND $2
            GROUP BY category
            ORDER BY total_revenue DESC
        ",
    },
    CannedReport {
        name: "top_products",
        sql: "
            SELECT
                product_name,
                category,
                SUM(net_amount) AS total_revenue,
                SUM(quantity) AS units_sold
            FROM fct_orders
            WHERE order_date BETWEEN $1 AND $2
            GROUP BY product_name, category
            ORDER BY total_revenue DESC
            LIMIT 10
        ",
    },
    CannedReport {
        name: "rep_leaderboard",
        sql: "
            SELECT
                rep_name,
                order_region AS rep_region,
                SUM(net_amount) AS total_revenue,
                COUNT(*) AS orders,
                COUNT(DISTINCT customer_id) AS customers
            FROM fct_orders
            WHERE order_date BETWEEN $1 AND $2
            GROUP BY rep_name, order_region
            ORDER BY total_revenue DESC
        ",
    },
    CannedReport {
        name: "segment_breakdown",
        sql: "
            SELECT
                customer_segment,
                SUM(net_amount) AS total_revenue,
                COUNT(DISTINCT customer_id) AS customers,
                AVG(net_amount) AS avg_order_value
            FROM fct_orders
            WHERE order_date BETWEEN $1 AND $2
            GROUP BY customer_segment
            ORDER BY total_revenue DESC
        ",
    },
];

pub fn find(name: &str) -> Option<&'static CannedReport> {
    REPORTS.iter().find(|r| r.name == name)
}

/// Run a canned report through the cache. The fingerprint is the report
/// name; the date range forms the parameter part of the key.
pub async fn run_report(
    report: &CannedReport,
    start: NaiveDate,
    end: NaiveDate,
    ttl: Duration,
    cache: &ResultCache,
    executor: &dyn QueryExecutor,
) -> Result<QueryResult, ExecutionError> {
    let params = vec![CellValue::Date(start), CellValue::Date(end)];
    cache
        .get_or_compute(report.name, &params, ttl, || async {
            executor.execute_with_params(report.sql, &params).await
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use salescope_core::models::{Column, ColumnType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingExecutor {
        calls: AtomicUsize,
        last: Mutex<Option<(String, Vec<CellValue>)>>,
    }

    impl RecordingExecutor {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl QueryExecutor for RecordingExecutor {
        async fn execute_with_params(
            &self,
            sql: &str,
            params: &[CellValue],
        ) -> Result<QueryResult, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((sql.to_string(), params.to_vec()));
            Ok(QueryResult::new(
                vec![Column {
                    name: "revenue".to_string(),
                    column_type: ColumnType::Integer,
                }],
                vec![vec![CellValue::Integer(123)]],
            ))
        }
    }

    #[test]
    fn test_every_report_is_findable_and_parameterized() {
        for report in REPORTS {
            assert!(find(report.name).is_some());
            assert!(report.sql.contains("$1") && report.sql.contains("$2"));
            assert!(report.sql.contains("FROM fct_orders"));
        }
        assert!(find("no_such_report").is_none());
    }

    #[tokio::test]
    async fn test_run_report_binds_range_and_caches() {
        let cache = ResultCache::new();
        let executor = RecordingExecutor::new();
        let report = find("daily_trend").unwrap();
        let start: NaiveDate = "2024-01-01".parse().unwrap();
        let end: NaiveDate = "2024-01-31".parse().unwrap();
        let ttl = Duration::from_secs(300);

        let result = run_report(report, start, end, ttl, &cache, &executor)
            .await
            .unwrap();
        assert_eq!(result.rows[0][0], CellValue::Integer(123));

        let (sql, params) = executor.last.lock().unwrap().clone().unwrap();
        assert_eq!(sql, report.sql);
        assert_eq!(
            params,
            vec![CellValue::Date(start), CellValue::Date(end)]
        );

        // Same range within the TTL is served from the cache
        run_report(report, start, end, ttl, &cache, &executor)
            .await
            .unwrap();
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);

        // A different range is a different entry
        let other_end: NaiveDate = "2024-02-28".parse().unwrap();
        run_report(report, start, other_end, ttl, &cache, &executor)
            .await
            .unwrap();
        assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
    }
}
