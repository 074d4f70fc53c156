//! `SQLite` implementation of [`Directory`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use repairdesk_app::ports::Directory;
use repairdesk_domain::directory::{Appliance, Client, Role, User};
use repairdesk_domain::error::RepairDeskError;
use repairdesk_domain::id::{ApplianceId, ClientId, UserId};

use crate::columns::variant;
use crate::error::StorageError;

struct UserRow(User);

impl<'r> FromRow<'r, SqliteRow> for UserRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        Ok(Self(User {
            id: UserId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
            role: variant(&role)?,
            active: row.try_get("active")?,
        }))
    }
}

struct ClientRow(Client);

impl<'r> FromRow<'r, SqliteRow> for ClientRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Client {
            id: ClientId::from_uuid(row.try_get("id")?),
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
        }))
    }
}

struct ApplianceRow(Appliance);

impl<'r> FromRow<'r, SqliteRow> for ApplianceRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Appliance {
            id: ApplianceId::from_uuid(row.try_get("id")?),
            client_id: ClientId::from_uuid(row.try_get("client_id")?),
            category: row.try_get("category")?,
            manufacturer: row.try_get("manufacturer")?,
            model: row.try_get("model")?,
            serial_number: row.try_get("serial_number")?,
        }))
    }
}

const INSERT_USER: &str = "INSERT INTO users (id, name, role, active) VALUES (?, ?, ?, ?)";
const SELECT_USER: &str = "SELECT * FROM users WHERE id = ?";
const SELECT_USERS_BY_ROLE: &str = "SELECT * FROM users WHERE role = ? ORDER BY name ASC";

const INSERT_CLIENT: &str = "INSERT INTO clients (id, name, phone, email) VALUES (?, ?, ?, ?)";
const SELECT_CLIENT: &str = "SELECT * FROM clients WHERE id = ?";

const INSERT_APPLIANCE: &str = r"
    INSERT INTO appliances (id, client_id, category, manufacturer, model, serial_number)
    VALUES (?, ?, ?, ?, ?, ?)
";
const SELECT_APPLIANCE: &str = "SELECT * FROM appliances WHERE id = ?";

/// `SQLite`-backed directory of users, clients, and appliances.
pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    /// Create a new directory using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl Directory for SqliteDirectory {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepairDeskError> {
        let row: Option<UserRow> = sqlx::query_as(SELECT_USER)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.0))
    }

    async fn find_users_by_role(&self, role: Role) -> Result<Vec<User>, RepairDeskError> {
        let rows: Vec<UserRow> = sqlx::query_as(SELECT_USERS_BY_ROLE)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn create_user(&self, user: User) -> Result<User, RepairDeskError> {
        sqlx::query(INSERT_USER)
            .bind(user.id.as_uuid())
            .bind(&user.name)
            .bind(user.role.as_str())
            .bind(user.active)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(user)
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>, RepairDeskError> {
        let row: Option<ClientRow> = sqlx::query_as(SELECT_CLIENT)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.0))
    }

    async fn create_client(&self, client: Client) -> Result<Client, RepairDeskError> {
        sqlx::query(INSERT_CLIENT)
            .bind(client.id.as_uuid())
            .bind(&client.name)
            .bind(&client.phone)
            .bind(&client.email)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(client)
    }

    async fn get_appliance(&self, id: ApplianceId) -> Result<Option<Appliance>, RepairDeskError> {
        let row: Option<ApplianceRow> = sqlx::query_as(SELECT_APPLIANCE)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.0))
    }

    async fn create_appliance(&self, appliance: Appliance) -> Result<Appliance, RepairDeskError> {
        sqlx::query(INSERT_APPLIANCE)
            .bind(appliance.id.as_uuid())
            .bind(appliance.client_id.as_uuid())
            .bind(&appliance.category)
            .bind(&appliance.manufacturer)
            .bind(&appliance.model)
            .bind(&appliance.serial_number)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(appliance)
    }
}
