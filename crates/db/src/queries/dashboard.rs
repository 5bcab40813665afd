// crates/db/src/queries/dashboard.rs
// Summary numbers for the admin home and the client portal.

use agencydesk_types::{ApprovalStatus, InvoiceStatus, ProjectStatus};
use serde::Serialize;
use ts_rs::TS;

use crate::{Approval, Client, Database, DbResult, Invoice, Project};

/// Rows shown in the "recent" panels.
const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    #[ts(type = "number")]
    pub total_clients: i64,
    #[ts(type = "number")]
    pub active_clients: i64,
    #[ts(type = "number")]
    pub active_projects: i64,
    #[ts(type = "number")]
    pub open_tasks: i64,
    #[ts(type = "number")]
    pub pending_approvals: i64,
    #[ts(type = "number")]
    pub open_leads: i64,
    pub revenue_paid: f64,
    pub revenue_outstanding: f64,
    #[ts(type = "number")]
    pub overdue_invoices: i64,
    pub recent_projects: Vec<Project>,
    pub recent_approvals: Vec<Approval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct ClientOverview {
    pub client: Client,
    pub projects: Vec<Project>,
    #[ts(type = "number")]
    pub active_projects: i64,
    #[ts(type = "number")]
    pub awaiting_review: i64,
    pub outstanding_amount: f64,
    pub recent_invoices: Vec<Invoice>,
    pub recent_approvals: Vec<Approval>,
}

impl Database {
    /// Counts and totals for the admin dashboard. The independent reads run
    /// concurrently.
    pub async fn admin_overview(&self) -> DbResult<AdminOverview> {
        let (
            total_clients,
            active_clients,
            active_projects,
            open_tasks,
            pending_approvals,
            open_leads,
            revenue_paid,
            revenue_outstanding,
            overdue_invoices,
            projects,
            approvals,
        ) = tokio::try_join!(
            self.count("SELECT COUNT(*) FROM clients"),
            self.count("SELECT COUNT(*) FROM clients WHERE status = 'active'"),
            self.count("SELECT COUNT(*) FROM projects WHERE status = 'active'"),
            self.count("SELECT COUNT(*) FROM tasks WHERE status != 'done'"),
            self.count("SELECT COUNT(*) FROM approvals WHERE status = 'pending'"),
            self.count("SELECT COUNT(*) FROM leads WHERE status != 'closed'"),
            self.sum("SELECT COALESCE(SUM(amount), 0.0) FROM invoices WHERE status = 'paid'"),
            self.sum(
                "SELECT COALESCE(SUM(amount), 0.0) FROM invoices
                 WHERE status IN ('pending', 'overdue')"
            ),
            self.count("SELECT COUNT(*) FROM invoices WHERE status = 'overdue'"),
            self.list_projects(),
            self.list_approvals(),
        )?;

        Ok(AdminOverview {
            total_clients,
            active_clients,
            active_projects,
            open_tasks,
            pending_approvals,
            open_leads,
            revenue_paid,
            revenue_outstanding,
            overdue_invoices,
            recent_projects: projects.into_iter().take(RECENT_LIMIT).collect(),
            recent_approvals: approvals.into_iter().take(RECENT_LIMIT).collect(),
        })
    }

    /// What a client sees on their portal home.
    pub async fn client_overview(&self, client_id: &str) -> DbResult<ClientOverview> {
        let (client, projects, invoices, approvals) = tokio::try_join!(
            self.get_client(client_id),
            self.list_projects_for_client(client_id),
            self.list_invoices_for_client(client_id),
            self.list_approvals_for_client(client_id),
        )?;

        let active_projects = projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Active)
            .count() as i64;
        let awaiting_review = approvals
            .iter()
            .filter(|a| a.status == ApprovalStatus::Pending)
            .count() as i64;
        let outstanding_amount = invoices
            .iter()
            .filter(|i| i.status != InvoiceStatus::Paid)
            .map(|i| i.amount)
            .sum();

        Ok(ClientOverview {
            client,
            projects,
            active_projects,
            awaiting_review,
            outstanding_amount,
            recent_invoices: invoices.into_iter().take(RECENT_LIMIT).collect(),
            recent_approvals: approvals.into_iter().take(RECENT_LIMIT).collect(),
        })
    }

    async fn count(&self, sql: &'static str) -> DbResult<i64> {
        let n: i64 = sqlx::query_scalar(sql).fetch_one(self.pool()).await?;
        Ok(n)
    }

    async fn sum(&self, sql: &'static str) -> DbResult<f64> {
        let total: f64 = sqlx::query_scalar(sql).fetch_one(self.pool()).await?;
        Ok(total)
    }
}
