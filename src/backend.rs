//! The admin REST backend: signing in, expense and category maintenance,
//! restocks, and narrowing expense records down the way the back-office
//! expense screen does before exporting.

use std::cmp::Reverse;
use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ureq::http::{Response, StatusCode};
use ureq::{Agent, Body, RequestBuilder};

use crate::error::{RapportError, Result};
use crate::report::{parse_timestamp, ExpenseItem};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:7000";
pub const UNDEFINED_CATEGORY: &str = "Non définie";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExpenseCategory {
    pub expense_category_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct ExpensesResponse {
    #[serde(default)]
    expenses: Vec<ExpenseItem>,
}

#[derive(Deserialize)]
struct CategoriesResponse {
    #[serde(default)]
    categories: Vec<ExpenseCategory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Single(NaiveDate),
    /// Inclusive on both ends
    Range(NaiveDate, NaiveDate),
}

impl DateFilter {
    fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            DateFilter::All => None,
            DateFilter::Single(day) => Some((day, day)),
            DateFilter::Range(from, to) => Some((from, to)),
        }
    }

    /// Only the calendar part of the record's date is compared
    pub fn matches(&self, date: &str) -> bool {
        let Some((from, to)) = self.bounds() else {
            return true;
        };
        match date
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        {
            Some(day) => from <= day && day <= to,
            None => false,
        }
    }

    pub fn label(&self) -> String {
        match self {
            DateFilter::All => "Toutes les dates".to_string(),
            DateFilter::Single(day) => format!("Le {}", day.format("%d/%m/%Y")),
            DateFilter::Range(from, to) => format!(
                "Du {} au {}",
                from.format("%d/%m/%Y"),
                to.format("%d/%m/%Y")
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub date: DateFilter,
    /// Category id, `None` for all categories
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ExpenseFilter {
    pub fn category_label(&self, categories: &[ExpenseCategory]) -> String {
        match &self.category {
            None => "Toutes les catégories".to_string(),
            Some(id) => format!(
                "Catégorie: {}",
                category_name(categories, id).unwrap_or_default()
            ),
        }
    }

    fn matches_search(&self, expense: &ExpenseItem, categories: &[ExpenseCategory]) -> bool {
        let Some(term) = self.search.as_deref().map(str::to_lowercase) else {
            return true;
        };
        let in_description = expense
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&term));
        let in_category = category_name(categories, &expense.expense_category_id)
            .is_some_and(|name| name.to_lowercase().contains(&term));
        in_description || in_category || expense.amount.to_string().contains(&term)
    }

    pub fn matches(&self, expense: &ExpenseItem, categories: &[ExpenseCategory]) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |id| expense.expense_category_id == id);
        category_ok && self.date.matches(&expense.date) && self.matches_search(expense, categories)
    }

    /// Matching expenses, enriched and newest first
    pub fn apply(
        &self,
        expenses: Vec<ExpenseItem>,
        categories: &[ExpenseCategory],
    ) -> Vec<ExpenseItem> {
        let mut kept: Vec<ExpenseItem> = expenses
            .into_iter()
            .filter(|e| self.matches(e, categories))
            .collect();
        enrich_expenses(&mut kept, categories);
        // undated records sink to the bottom
        kept.sort_by_key(|e| Reverse(parse_timestamp(&e.date)));
        kept
    }
}

fn category_name<'a>(categories: &'a [ExpenseCategory], id: &str) -> Option<&'a str> {
    categories
        .iter()
        .find(|c| c.expense_category_id == id)
        .map(|c| c.name.as_str())
}

/// Fill in each expense's category name from the category list. A name the
/// record already carries is kept when its id is not in the list.
pub fn enrich_expenses(expenses: &mut [ExpenseItem], categories: &[ExpenseCategory]) {
    for expense in expenses {
        let name = category_name(categories, &expense.expense_category_id)
            .or(expense.category_name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNDEFINED_CATEGORY)
            .to_string();
        expense.category_name = Some(name);
    }
}

/// Credentials for `POST /admin/auth/login`
#[derive(Debug, Serialize)]
pub struct AdminCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Admin {
    pub admin_id: String,
    pub admin_email: String,
    pub admin_name: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    admin: Option<Admin>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// A signed-in administrator and the token the backend issued
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSession {
    pub admin: Admin,
    pub token: String,
}

/// Body of an expense create or update; unset fields are left out
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpenseDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct ExpenseResponse {
    #[serde(default)]
    expense: Option<ExpenseItem>,
}

#[derive(Deserialize)]
struct CategoryResponse {
    #[serde(default, alias = "category")]
    expense_category: Option<ExpenseCategory>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RestockItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restock_item_id: Option<String>,
    pub product_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Restock {
    pub restock_id: String,
    pub date: String,
    #[serde(default)]
    pub items: Vec<RestockItem>,
}

impl Restock {
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Purchase cost of the lines that carry a price
    pub fn total_cost(&self) -> f64 {
        self.items
            .iter()
            .filter_map(|i| i.purchase_price.map(|p| p * f64::from(i.quantity)))
            .sum()
    }
}

#[derive(Serialize)]
struct RestockRequest<'a> {
    items: &'a [RestockItem],
}

#[derive(Deserialize)]
struct RestocksResponse {
    #[serde(default)]
    restocks: Vec<Restock>,
}

#[derive(Deserialize)]
struct RestockResponse {
    restock: Restock,
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| RapportError::Backend(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| RapportError::Backend(e.to_string()))
}

fn status_error(status: StatusCode) -> RapportError {
    RapportError::Backend(format!(
        "Erreur {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    ))
}

/// Turn a login reply into a session, whatever its status code
fn login_outcome(status: StatusCode, body: &str) -> Result<AdminSession> {
    let parsed: Option<LoginResponse> = serde_json::from_str(body).ok();
    match parsed {
        Some(LoginResponse {
            success: true,
            admin: Some(admin),
            token: Some(token),
            ..
        }) if status.is_success() => Ok(AdminSession { admin, token }),
        Some(LoginResponse {
            message: Some(message),
            ..
        }) => Err(RapportError::Backend(message)),
        _ => Err(RapportError::Backend("Erreur de connexion".to_string())),
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteMethod {
    Post,
    Put,
}

/// Client for the admin API
pub struct BackendClient {
    agent: Agent,
    base_url: String,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        let mut client = Self::anonymous(base_url);
        client.token = Some(token.into());
        client
    }

    /// A client that sends no bearer token, for signing in
    pub fn anonymous(base_url: &str) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(10)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        match &self.token {
            Some(token) => request.header("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    /// Status and body of a finished call
    fn read(
        url: &str,
        outcome: std::result::Result<Response<Body>, ureq::Error>,
    ) -> Result<(StatusCode, String)> {
        let mut response = outcome.map_err(|e| RapportError::Backend(format!("{url}: {e}")))?;
        let status = response.status();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| RapportError::Backend(e.to_string()))?;
        Ok((status, body))
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = self.url(path);
        debug!(%url, ?query, "backend request");

        let mut request = self.authorize(self.agent.get(&url));
        for (key, value) in query {
            request = request.query(*key, value);
        }

        let (status, body) = Self::read(&url, request.call())?;
        if !status.is_success() {
            return Err(status_error(status));
        }
        Ok(body)
    }

    fn send_raw<T: Serialize>(
        &self,
        method: WriteMethod,
        path: &str,
        payload: &T,
    ) -> Result<(StatusCode, String)> {
        let url = self.url(path);
        debug!(%url, ?method, "backend request");

        let json = encode(payload)?;
        let request = match method {
            WriteMethod::Post => self.agent.post(&url),
            WriteMethod::Put => self.agent.put(&url),
        };
        let request = self
            .authorize(request)
            .header("Content-Type", "application/json");
        Self::read(&url, request.send(&json))
    }

    fn send<T: Serialize>(&self, method: WriteMethod, path: &str, payload: &T) -> Result<String> {
        let (status, body) = self.send_raw(method, path, payload)?;
        if !status.is_success() {
            return Err(status_error(status));
        }
        Ok(body)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        debug!(%url, "backend delete");

        let (status, _) = Self::read(&url, self.authorize(self.agent.delete(&url)).call())?;
        if !status.is_success() {
            return Err(status_error(status));
        }
        Ok(())
    }

    /// `POST /admin/auth/login`
    pub fn admin_login(&self, email: &str, password: &str) -> Result<AdminSession> {
        let credentials = AdminCredentials { email, password };
        let (status, body) = self.send_raw(WriteMethod::Post, "/admin/auth/login", &credentials)?;
        let session = login_outcome(status, &body)?;
        info!(admin = %session.admin.admin_email, "admin signed in");
        Ok(session)
    }

    /// `GET /admin/expenses`, narrowed server-side by date and category
    pub fn expenses(&self, filter: &ExpenseFilter) -> Result<Vec<ExpenseItem>> {
        let mut query = Vec::new();
        if let Some((from, to)) = filter.date.bounds() {
            query.push(("startDate", from.format("%Y-%m-%d").to_string()));
            query.push(("endDate", to.format("%Y-%m-%d").to_string()));
        }
        if let Some(id) = &filter.category {
            query.push(("expense_category_id", id.clone()));
        }

        let body = self.get("/admin/expenses", &query)?;
        let parsed: ExpensesResponse = decode(&body)?;
        info!(count = parsed.expenses.len(), "fetched expenses");
        Ok(parsed.expenses)
    }

    /// `GET /admin/expenses/:id`
    pub fn expense(&self, id: &str) -> Result<ExpenseItem> {
        let body = self.get(&format!("/admin/expenses/{id}"), &[])?;
        let parsed: ExpenseResponse = decode(&body)?;
        parsed
            .expense
            .ok_or_else(|| RapportError::Backend(format!("dépense {id} introuvable")))
    }

    /// `POST /admin/expenses`; the created record when the backend echoes it
    pub fn create_expense(&self, draft: &ExpenseDraft) -> Result<Option<ExpenseItem>> {
        let body = self.send(WriteMethod::Post, "/admin/expenses", draft)?;
        Ok(decode::<ExpenseResponse>(&body).ok().and_then(|r| r.expense))
    }

    /// `PUT /admin/expenses/:id`
    pub fn update_expense(&self, id: &str, draft: &ExpenseDraft) -> Result<Option<ExpenseItem>> {
        let body = self.send(WriteMethod::Put, &format!("/admin/expenses/{id}"), draft)?;
        Ok(decode::<ExpenseResponse>(&body).ok().and_then(|r| r.expense))
    }

    /// `DELETE /admin/expenses/:id`
    pub fn delete_expense(&self, id: &str) -> Result<()> {
        self.delete(&format!("/admin/expenses/{id}"))
    }

    /// `GET /admin/expenses/categories`
    pub fn expense_categories(&self) -> Result<Vec<ExpenseCategory>> {
        let body = self.get("/admin/expenses/categories", &[])?;
        let parsed: CategoriesResponse = decode(&body)?;
        Ok(parsed.categories)
    }

    /// `POST /admin/expenses/categories`
    pub fn create_category(&self, draft: &CategoryDraft) -> Result<Option<ExpenseCategory>> {
        let body = self.send(WriteMethod::Post, "/admin/expenses/categories", draft)?;
        Ok(decode::<CategoryResponse>(&body)
            .ok()
            .and_then(|r| r.expense_category))
    }

    /// `PUT /admin/expenses/categories/:id`
    pub fn update_category(
        &self,
        id: &str,
        draft: &CategoryDraft,
    ) -> Result<Option<ExpenseCategory>> {
        let body = self.send(
            WriteMethod::Put,
            &format!("/admin/expenses/categories/{id}"),
            draft,
        )?;
        Ok(decode::<CategoryResponse>(&body)
            .ok()
            .and_then(|r| r.expense_category))
    }

    /// `DELETE /admin/expenses/categories/:id`
    pub fn delete_category(&self, id: &str) -> Result<()> {
        self.delete(&format!("/admin/expenses/categories/{id}"))
    }

    /// `POST /admin/restock/` with the lines received
    pub fn create_restock(&self, items: &[RestockItem]) -> Result<Restock> {
        let body = self.send(WriteMethod::Post, "/admin/restock/", &RestockRequest { items })?;
        let parsed: RestockResponse = decode(&body)?;
        info!(restock = %parsed.restock.restock_id, "restock recorded");
        Ok(parsed.restock)
    }

    /// `GET /admin/restock/`
    pub fn restocks(&self) -> Result<Vec<Restock>> {
        let body = self.get("/admin/restock/", &[])?;
        let parsed: RestocksResponse = decode(&body)?;
        Ok(parsed.restocks)
    }

    /// `GET /admin/restock/:id`
    pub fn restock(&self, id: &str) -> Result<Restock> {
        let body = self.get(&format!("/admin/restock/{id}"), &[])?;
        let parsed: RestockResponse = decode(&body)?;
        Ok(parsed.restock)
    }
}
