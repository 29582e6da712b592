//! Dispatch tickets

use chrono::Local;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::TicketsConfig,
    error::AppResult,
    export::{self, DispatchWorkbook},
    models::{
        equipment::tidy,
        ticket::{DispatchTicket, TicketRequest},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct TicketsService {
    repository: Repository,
    config: TicketsConfig,
}

impl TicketsService {
    pub fn new(repository: Repository, config: TicketsConfig) -> Self {
        Self { repository, config }
    }

    /// Render the workbook for the selected sites and record it in the history
    pub async fn generate(&self, data: &TicketRequest, writer: &str) -> AppResult<(DispatchTicket, DispatchWorkbook)> {
        data.validate()?;
        let sites: Vec<String> = data.sites.iter().map(|s| tidy(s)).collect();

        let rows = self.repository.equipment.dispatched_to(&sites).await?;
        let workbook = export::render_dispatch_ticket(
            &self.config.title,
            &sites,
            &rows,
            writer,
            Local::now().naive_local(),
        )?;

        let ticket = self
            .repository
            .tickets
            .create(&workbook.sites.join(", "), writer)
            .await?;

        tracing::info!(ticket = %ticket.id, sites = %ticket.site_names, writer, "dispatch ticket generated");
        Ok((ticket, workbook))
    }

    pub async fn list(&self) -> AppResult<Vec<DispatchTicket>> {
        self.repository.tickets.list().await
    }

    pub async fn delete_many(&self, ids: &[Uuid], admin: &str) -> AppResult<u64> {
        let deleted = self.repository.tickets.delete_many(ids).await?;
        tracing::info!(deleted, admin, "ticket history pruned");
        Ok(deleted)
    }
}
