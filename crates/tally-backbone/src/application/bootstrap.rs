use sea_orm::{DatabaseConnection, TransactionTrait};
use tally_auth::RoleLabel;
use tracing::info;

use crate::{
    config::BootstrapConfig,
    domain::{
        identity::{NewUser, UserService},
        role::{NewRole, RoleService},
        team::{NewTeam, TeamService},
    },
};

use super::Application;

fn builtin_role_name(label: &RoleLabel) -> &'static str {
    match label {
        RoleLabel::SuperAdmin => "Super Admin",
        RoleLabel::ProductOwner => "Product Owner",
        RoleLabel::Admin => "Admin",
        RoleLabel::User => "User",
        RoleLabel::RemoteCi => "RemoteCI",
        RoleLabel::Feeder => "Feeder",
        RoleLabel::Custom(_) => "Custom",
    }
}

pub(super) async fn run(application: &Application, config: &BootstrapConfig) -> anyhow::Result<()> {
    seed(
        &application.database_connection,
        application.role_service.as_ref(),
        application.team_service.as_ref(),
        application.user_service.as_ref(),
        config,
    )
    .await
}

/// Inserts the built-in roles, the admin team and the super admin user when they are missing.
async fn seed(
    database_connection: &DatabaseConnection,
    role_service: &(dyn RoleService + Sync + Send),
    team_service: &(dyn TeamService + Sync + Send),
    user_service: &(dyn UserService + Sync + Send),
    config: &BootstrapConfig,
) -> anyhow::Result<()> {
    let transaction = database_connection.begin().await?;

    let mut super_admin_role_id = None;
    for label in RoleLabel::BUILTIN {
        let role = match role_service.get_by_label(&transaction, label.as_str()).await? {
            Some(role) => role,
            None => {
                let new_role = NewRole {
                    name: builtin_role_name(&label).to_owned(),
                    label: Some(label.to_string()),
                    description: None,
                };
                role_service.create(&transaction, new_role).await?
            }
        };
        if label == RoleLabel::SuperAdmin {
            super_admin_role_id = Some(role.id);
        }
    }
    let super_admin_role_id =
        super_admin_role_id.ok_or_else(|| anyhow::anyhow!("super admin role could not be provisioned"))?;

    let team = match team_service.get_by_name(&transaction, &config.team_name).await? {
        Some(team) => team,
        None => team_service.create(&transaction, NewTeam { name: config.team_name.to_owned(), parent_id: None }).await?,
    };

    if user_service.get_by_name(&transaction, &config.admin_name).await?.is_none() {
        let new_user = NewUser {
            name: config.admin_name.to_owned(),
            password: config.admin_password.to_owned(),
            role_id: super_admin_role_id,
            team_id: team.id,
        };
        user_service.create(&transaction, new_user).await?;
        info!("super admin user({}) provisioned.", config.admin_name);
    }

    transaction.commit().await?;

    Ok(())
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tally_auth::RoleLabel;
    use uuid::Uuid;

    use super::seed;
    use crate::{
        config::BootstrapConfig,
        database::ResourceState,
        domain::{
            identity::{MockUserService, User},
            role::{test::role_model, MockRoleService, Role},
            team::{MockTeamService, Team},
        },
    };

    fn config() -> BootstrapConfig {
        BootstrapConfig {
            team_name: "admin".to_owned(),
            admin_name: "admin".to_owned(),
            admin_password: "admin".to_owned(),
        }
    }

    fn team(name: &str) -> Team {
        let now = Utc::now();
        Team {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            parent_id: None,
            state: ResourceState::Active,
            etag: "7e4a".to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    fn user(name: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            role_id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            state: ResourceState::Active,
            etag: "7e4b".to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn when_catalog_is_empty_then_seed_creates_roles_team_and_admin() {
        let mock_connection = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let mut role_service = MockRoleService::new();
        role_service.expect_get_by_label().times(RoleLabel::BUILTIN.len()).returning(|_, _| Ok(None));
        role_service
            .expect_create()
            .times(RoleLabel::BUILTIN.len())
            .returning(|_, new_role| Ok(Role::from(role_model(&new_role.name, &new_role.label.unwrap_or_default()))));
        let mut team_service = MockTeamService::new();
        team_service.expect_get_by_name().times(1).returning(|_, _| Ok(None));
        team_service.expect_create().times(1).returning(|_, new_team| Ok(team(&new_team.name)));
        let mut user_service = MockUserService::new();
        user_service.expect_get_by_name().times(1).returning(|_, _| Ok(None));
        user_service.expect_create().withf(|_, new_user| new_user.name == "admin").times(1).returning(|_, _| Ok(user("admin")));

        let result = seed(&mock_connection, &role_service, &team_service, &user_service, &config()).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn when_catalog_is_already_seeded_then_seed_creates_nothing() {
        let mock_connection = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let mut role_service = MockRoleService::new();
        role_service
            .expect_get_by_label()
            .times(RoleLabel::BUILTIN.len())
            .returning(|_, label| Ok(Some(Role::from(role_model(label, label)))));
        role_service.expect_create().never();
        let mut team_service = MockTeamService::new();
        team_service.expect_get_by_name().times(1).returning(|_, name| Ok(Some(team(name))));
        team_service.expect_create().never();
        let mut user_service = MockUserService::new();
        user_service.expect_get_by_name().times(1).returning(|_, name| Ok(Some(user(name))));
        user_service.expect_create().never();

        let result = seed(&mock_connection, &role_service, &team_service, &user_service, &config()).await;

        assert!(result.is_ok());
    }
}
