//! In-memory ticket and comment store.
//!
//! Persistence proper is an external collaborator; this store exists so the
//! producer endpoints have something transactional-looking to complete before
//! they broadcast. Nothing here survives a restart.

use dashmap::DashMap;
use events::{epoch_millis, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub status: TicketStatus,
    pub owner_id: UserId,
    pub assignee_id: Option<UserId>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub ticket_id: String,
    pub author_id: UserId,
    pub body: String,
    pub created_at: i64,
}

pub struct TicketStore {
    tickets: DashMap<String, Ticket>,
    comments: DashMap<String, Vec<Comment>>,
    next_id: AtomicU64,
}

impl TicketStore {
    pub fn new() -> Self {
        Self {
            tickets: DashMap::new(),
            comments: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn create_ticket(&self, owner_id: &str, subject: &str, body: &str) -> Ticket {
        let ticket = Ticket {
            id: self.next_id("T"),
            subject: subject.to_string(),
            body: body.to_string(),
            status: TicketStatus::Open,
            owner_id: owner_id.to_string(),
            assignee_id: None,
            created_at: epoch_millis(),
        };
        self.tickets.insert(ticket.id.clone(), ticket.clone());
        ticket
    }

    pub fn get(&self, ticket_id: &str) -> Option<Ticket> {
        self.tickets.get(ticket_id).map(|t| t.clone())
    }

    pub fn list(&self) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self.tickets.iter().map(|t| t.clone()).collect();
        tickets.sort_by(|a, b| a.id.cmp(&b.id));
        tickets
    }

    /// Edit the ticket's own fields. `None` arguments leave a field alone.
    pub fn update_ticket(
        &self,
        ticket_id: &str,
        subject: Option<&str>,
        body: Option<&str>,
    ) -> Option<Ticket> {
        let mut ticket = self.tickets.get_mut(ticket_id)?;
        if let Some(subject) = subject {
            ticket.subject = subject.to_string();
        }
        if let Some(body) = body {
            ticket.body = body.to_string();
        }
        Some(ticket.clone())
    }

    pub fn set_status(&self, ticket_id: &str, status: TicketStatus) -> Option<Ticket> {
        let mut ticket = self.tickets.get_mut(ticket_id)?;
        ticket.status = status;
        Some(ticket.clone())
    }

    pub fn assign(&self, ticket_id: &str, assignee_id: &str) -> Option<Ticket> {
        let mut ticket = self.tickets.get_mut(ticket_id)?;
        ticket.assignee_id = Some(assignee_id.to_string());
        if ticket.status == TicketStatus::Open {
            ticket.status = TicketStatus::InProgress;
        }
        Some(ticket.clone())
    }

    /// Append a comment, returning it together with the ticket it belongs to
    /// so producers can route notifications to the ticket owner.
    pub fn add_comment(
        &self,
        ticket_id: &str,
        author_id: &str,
        body: &str,
    ) -> Option<(Ticket, Comment)> {
        let ticket = self.get(ticket_id)?;
        let comment = Comment {
            id: self.next_id("C"),
            ticket_id: ticket_id.to_string(),
            author_id: author_id.to_string(),
            body: body.to_string(),
            created_at: epoch_millis(),
        };
        self.comments
            .entry(ticket_id.to_string())
            .or_default()
            .push(comment.clone());
        Some((ticket, comment))
    }

    pub fn comments(&self, ticket_id: &str) -> Vec<Comment> {
        self.comments
            .get(ticket_id)
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl Default for TicketStore {
    fn default() -> Self {
        Self::new()
    }
}
