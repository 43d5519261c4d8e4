use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, LoaderTrait, PaginatorTrait, QueryFilter,
    Select, Set,
};
use tally_auth::{
    principal::{PRODUCT_OWNER_LABEL, SUPER_ADMIN_LABEL},
    Principal, RoleLabel,
};
use tally_common::{gen_etag, label_from_name, normalize_etag, validate_label, validate_name};
use tracing::info;
use uuid::Uuid;

use crate::database::{
    constraint_violation, permission, role, role_permission, ConstraintViolation, Persistable, ResourceState,
};

use super::{
    permission::Permission,
    purge_archived,
    query::{ListQuery, Page, QueryError},
    update_if_match,
};

pub(crate) const EMBEDS: &[&str] = &["permissions"];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Role {
    pub id: Uuid,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub permissions: Option<Vec<Permission>>,
    expected_etag: String,
    archived: bool,
    updated_name: Option<String>,
    updated_description: Option<Option<String>>,
}

impl Role {
    pub fn guard(&mut self, if_match: &str) {
        self.expected_etag = normalize_etag(if_match).to_owned();
    }

    pub fn is_archived(&self) -> bool {
        self.state == ResourceState::Archived
    }

    pub fn archive(&mut self) {
        self.archived = true
    }

    pub fn update_name(&mut self, new_name: String) -> Result<()> {
        if !validate_name(&new_name) {
            return Err(Error::InvalidName);
        }
        if self.name != new_name {
            self.updated_name = Some(new_name);
        }
        Ok(())
    }

    pub fn update_description(&mut self, new_description: Option<String>) {
        if self.description != new_description {
            self.updated_description = Some(new_description);
        }
    }
}

#[async_trait]
impl Persistable for Role {
    type Error = Error;

    async fn persist(self, transaction: &DatabaseTransaction) -> Result<String> {
        let now = Utc::now();

        if self.archived {
            let changes =
                role::ActiveModel { state: Set(ResourceState::Archived), updated_at: Set(now), ..Default::default() };
            if !update_if_match::<role::Entity>(transaction, changes, self.id, &self.expected_etag).await? {
                return Err(Error::Conflict);
            }

            info!("role(id: {}, label: {}) archived.", self.id, self.label);
            return Ok(self.expected_etag);
        }

        let etag = gen_etag();
        let changes = role::ActiveModel {
            name: self.updated_name.map(Set).unwrap_or_default(),
            description: self.updated_description.map(Set).unwrap_or_default(),
            etag: Set(etag.clone()),
            updated_at: Set(now),
            ..Default::default()
        };
        if !update_if_match::<role::Entity>(transaction, changes, self.id, &self.expected_etag).await? {
            return Err(Error::Conflict);
        }

        Ok(etag)
    }
}

/// Which roles a principal may read.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RoleVisibility {
    All,
    AllBut(Vec<String>),
    Own(Uuid),
}

impl RoleVisibility {
    pub fn of(principal: &Principal) -> Self {
        match principal.role {
            RoleLabel::SuperAdmin => Self::All,
            RoleLabel::ProductOwner => Self::AllBut(vec![SUPER_ADMIN_LABEL.to_owned()]),
            RoleLabel::Admin => Self::AllBut(vec![SUPER_ADMIN_LABEL.to_owned(), PRODUCT_OWNER_LABEL.to_owned()]),
            _ => Self::Own(principal.role_id),
        }
    }

    pub fn allows(&self, role: &Role) -> bool {
        match self {
            Self::All => true,
            Self::AllBut(hidden) => !hidden.contains(&role.label),
            Self::Own(role_id) => &role.id == role_id,
        }
    }
}

pub(crate) struct NewRole {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait RoleService {
    async fn get_all(
        &self,
        transaction: &DatabaseTransaction,
        query: &ListQuery,
        visibility: RoleVisibility,
    ) -> Result<Page<Role>>;
    async fn get_archived(&self, transaction: &DatabaseTransaction) -> Result<Vec<Role>>;
    async fn get(&self, transaction: &DatabaseTransaction, id: &Uuid, embed_permissions: bool)
        -> Result<Option<Role>>;
    async fn get_by_label(&self, transaction: &DatabaseTransaction, label: &str) -> Result<Option<Role>>;
    async fn create(&self, transaction: &DatabaseTransaction, new_role: NewRole) -> Result<Role>;
    async fn purge(&self, transaction: &DatabaseTransaction) -> Result<u64>;
    async fn attach_permission(
        &self,
        transaction: &DatabaseTransaction,
        role_id: &Uuid,
        permission_id: &Uuid,
    ) -> Result<()>;
    /// Returns whether a link was removed.
    async fn detach_permission(
        &self,
        transaction: &DatabaseTransaction,
        role_id: &Uuid,
        permission_id: &Uuid,
    ) -> Result<bool>;
}

pub(crate) struct PostgresRoleService;

impl PostgresRoleService {
    async fn with_permissions(&self, transaction: &DatabaseTransaction, models: Vec<role::Model>) -> Result<Vec<Role>> {
        let permissions = models.load_many_to_many(permission::Entity, role_permission::Entity, transaction).await?;

        Ok(models
            .into_iter()
            .zip(permissions)
            .map(|(model, permissions)| Role {
                permissions: Some(permissions.into_iter().map(Permission::from).collect()),
                ..Role::from(model)
            })
            .collect())
    }
}

/// Live roles matching `query` that `visibility` lets the caller see.
fn listing(query: &ListQuery, visibility: RoleVisibility) -> Result<Select<role::Entity>> {
    use role::{Column, Entity};

    query.ensure_embeds(EMBEDS)?;
    let select = query.apply(Entity::find(), &[])?.filter(Column::State.ne(ResourceState::Archived));

    Ok(match visibility {
        RoleVisibility::All => select,
        RoleVisibility::AllBut(hidden) => select.filter(Column::Label.is_not_in(hidden)),
        RoleVisibility::Own(role_id) => select.filter(Column::Id.eq(role_id)),
    })
}

#[async_trait]
impl RoleService for PostgresRoleService {
    async fn get_all(
        &self,
        transaction: &DatabaseTransaction,
        query: &ListQuery,
        visibility: RoleVisibility,
    ) -> Result<Page<Role>> {
        let select = listing(query, visibility)?;

        let count = select.clone().count(transaction).await?;
        let models = query.paginate(select).all(transaction).await?;

        let items = if query.embeds("permissions") {
            self.with_permissions(transaction, models).await?
        } else {
            models.into_iter().map(Role::from).collect()
        };

        Ok(Page { items, count })
    }

    async fn get_archived(&self, transaction: &DatabaseTransaction) -> Result<Vec<Role>> {
        use role::{Column, Entity};

        let models = Entity::find().filter(Column::State.eq(ResourceState::Archived)).all(transaction).await?;

        Ok(models.into_iter().map(Role::from).collect())
    }

    async fn get(
        &self,
        transaction: &DatabaseTransaction,
        id: &Uuid,
        embed_permissions: bool,
    ) -> Result<Option<Role>> {
        let Some(model) = role::Entity::find_by_id(*id).one(transaction).await? else {
            return Ok(None);
        };

        if embed_permissions {
            Ok(self.with_permissions(transaction, vec![model]).await?.pop())
        } else {
            Ok(Some(model.into()))
        }
    }

    async fn get_by_label(&self, transaction: &DatabaseTransaction, label: &str) -> Result<Option<Role>> {
        use role::{Column, Entity};

        let model = Entity::find().filter(Column::Label.eq(label)).one(transaction).await?;

        Ok(model.map(Role::from))
    }

    async fn create(&self, transaction: &DatabaseTransaction, new_role: NewRole) -> Result<Role> {
        if !validate_name(&new_role.name) {
            return Err(Error::InvalidName);
        }
        let label = new_role.label.unwrap_or_else(|| label_from_name(&new_role.name));
        if !validate_label(&label) {
            return Err(Error::InvalidLabel);
        }

        let now = Utc::now();
        let model = role::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_role.name),
            label: Set(label),
            description: Set(new_role.description),
            state: Set(ResourceState::Active),
            etag: Set(gen_etag()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(transaction)
        .await?;

        info!("role(id: {}, label: {}) created.", model.id, model.label);

        Ok(model.into())
    }

    async fn purge(&self, transaction: &DatabaseTransaction) -> Result<u64> {
        let purged = purge_archived::<role::Entity>(transaction).await?;
        info!("{purged} archived roles purged.");

        Ok(purged)
    }

    async fn attach_permission(
        &self,
        transaction: &DatabaseTransaction,
        role_id: &Uuid,
        permission_id: &Uuid,
    ) -> Result<()> {
        let link = role_permission::ActiveModel { role_id: Set(*role_id), permission_id: Set(*permission_id) };

        role_permission::Entity::insert(link).exec_without_returning(transaction).await.map_err(|e| {
            match constraint_violation(&e) {
                Some(ConstraintViolation::Unique) => Error::AlreadyLinked,
                _ => e.into(),
            }
        })?;

        info!("permission(id: {permission_id}) attached to role(id: {role_id}).");
        Ok(())
    }

    async fn detach_permission(
        &self,
        transaction: &DatabaseTransaction,
        role_id: &Uuid,
        permission_id: &Uuid,
    ) -> Result<bool> {
        use role_permission::{Column, Entity};

        let result = Entity::delete_many()
            .filter(Column::RoleId.eq(*role_id))
            .filter(Column::PermissionId.eq(*permission_id))
            .exec(transaction)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

impl From<role::Model> for Role {
    fn from(value: role::Model) -> Self {
        Self {
            id: value.id,
            name: value.name,
            label: value.label,
            description: value.description,
            state: value.state,
            expected_etag: value.etag.clone(),
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
            permissions: None,
            archived: false,
            updated_name: None,
            updated_description: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("invalid role name")]
    InvalidName,
    #[error("role label must consist of upper-case letters, digits and underscores")]
    InvalidLabel,
    #[error("role was modified concurrently or is archived")]
    Conflict,
    #[error("role label already exists")]
    NameConflicted,
    #[error("permission is already attached to role")]
    AlreadyLinked,
    #[error("referenced permission does not exist")]
    IntegrityViolation,
    #[error(transparent)]
    InvalidQuery(#[from] QueryError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<DbErr> for Error {
    fn from(value: DbErr) -> Self {
        match constraint_violation(&value) {
            Some(ConstraintViolation::Unique) => Self::NameConflicted,
            Some(ConstraintViolation::ForeignKey) => Self::IntegrityViolation,
            None => Self::Anyhow(value.into()),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait, TransactionTrait};
    use tally_auth::{Principal, RoleLabel};
    use uuid::Uuid;

    use super::{listing, Error, NewRole, PostgresRoleService, Role, RoleService, RoleVisibility};
    use crate::{
        database::{role, Persistable, ResourceState},
        domain::query::ListQuery,
    };

    pub(crate) fn role_model(name: &str, label: &str) -> role::Model {
        let now = Utc::now();
        role::Model {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            label: label.to_owned(),
            description: None,
            state: ResourceState::Active,
            etag: "41d2a7".to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    fn principal(role: RoleLabel) -> Principal {
        let team_id = Uuid::new_v4();
        Principal {
            id: Uuid::new_v4(),
            name: "someone".to_owned(),
            role_id: Uuid::new_v4(),
            role,
            team_id,
            teams: vec![team_id],
        }
    }

    #[test]
    fn when_principal_is_admin_then_super_admin_and_product_owner_roles_are_hidden() {
        let visibility = RoleVisibility::of(&principal(RoleLabel::Admin));

        assert!(!visibility.allows(&Role::from(role_model("Super Admin", "SUPER_ADMIN"))));
        assert!(!visibility.allows(&Role::from(role_model("Product Owner", "PRODUCT_OWNER"))));
        assert!(visibility.allows(&Role::from(role_model("User", "USER"))));
    }

    #[test]
    fn when_principal_is_product_owner_then_only_super_admin_role_is_hidden() {
        let visibility = RoleVisibility::of(&principal(RoleLabel::ProductOwner));

        assert!(!visibility.allows(&Role::from(role_model("Super Admin", "SUPER_ADMIN"))));
        assert!(visibility.allows(&Role::from(role_model("Product Owner", "PRODUCT_OWNER"))));
    }

    #[test]
    fn when_principal_is_plain_user_then_only_own_role_is_visible() {
        let user = principal(RoleLabel::User);
        let own = Role { id: user.role_id, ..Role::from(role_model("User", "USER")) };
        let visibility = RoleVisibility::of(&user);

        assert!(visibility.allows(&own));
        assert!(!visibility.allows(&Role::from(role_model("Admin", "ADMIN"))));
    }

    #[test]
    fn when_listing_roles_then_archived_rows_are_excluded() {
        let user = principal(RoleLabel::User);

        let all = listing(&ListQuery::default(), RoleVisibility::All).unwrap().build(DatabaseBackend::Postgres).to_string();
        let own = listing(&ListQuery::default(), RoleVisibility::of(&user))
            .unwrap()
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(all.contains(r#""roles"."state" <> 'archived'"#), "{all}");
        assert!(own.contains(r#""roles"."state" <> 'archived'"#), "{own}");
        assert!(own.contains(&format!(r#""roles"."id" = '{}'"#, user.role_id)), "{own}");
    }

    #[tokio::test]
    async fn when_creating_role_without_label_then_label_is_derived_from_name() {
        let mock_connection = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![role_model("Release Manager", "RELEASE_MANAGER")]])
                .into_connection(),
        );
        let transaction = mock_connection.begin().await.expect("begining transaction should be successful");

        let result = PostgresRoleService
            .create(&transaction, NewRole { name: "Release Manager".to_owned(), label: None, description: None })
            .await;
        transaction.commit().await.expect("commiting transaction should be successful");

        assert_eq!(result.expect("creating role should be successful").label, "RELEASE_MANAGER");
    }

    #[tokio::test]
    async fn when_creating_role_with_lowercase_label_then_role_service_returns_invalid_label_err() {
        let mock_connection = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let transaction = mock_connection.begin().await.expect("begining transaction should be successful");

        let result = PostgresRoleService
            .create(
                &transaction,
                NewRole { name: "Manager".to_owned(), label: Some("manager".to_owned()), description: None },
            )
            .await;

        assert!(matches!(result, Err(Error::InvalidLabel)));
    }

    #[tokio::test]
    async fn when_stale_etag_is_supplied_then_role_persist_returns_conflict_err() {
        let mock_connection = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }])
                .into_connection(),
        );
        let transaction = mock_connection.begin().await.expect("begining transaction should be successful");
        let mut role = Role::from(role_model("Manager", "MANAGER"));
        role.guard("outdated");
        role.update_description(Some("manages releases".to_owned()));

        assert!(matches!(role.persist(&transaction).await, Err(Error::Conflict)));
    }

    #[tokio::test]
    async fn when_permission_link_is_missing_then_detach_returns_false() {
        let mock_connection = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }])
                .into_connection(),
        );
        let transaction = mock_connection.begin().await.expect("begining transaction should be successful");

        let result = PostgresRoleService.detach_permission(&transaction, &Uuid::new_v4(), &Uuid::new_v4()).await;

        assert!(!result.expect("detaching permission should be successful"));
    }
}
