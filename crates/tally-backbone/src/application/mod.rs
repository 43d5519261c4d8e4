use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tally_auth::{auth::Authenticator, Principal};

use crate::{
    config::ApplicationConfig,
    database::{self, connect_to_database, DatabaseCredential},
    domain::{
        ci_test::{CiTestService, PostgresCiTestService},
        component::{ComponentService, PostgresComponentService},
        feeder::{FeederService, PostgresFeederService},
        identity::{PostgresAuthenticator, PostgresUserService, UserService},
        jobdefinition::{JobdefinitionService, PostgresJobdefinitionService},
        permission::{PermissionService, PostgresPermissionService},
        role::{PostgresRoleService, RoleService},
        team::{PostgresTeamService, TeamService},
    },
};

use self::{
    ci_test::{CiTestUseCase, CiTestUseCaseImpl},
    component::{ComponentUseCase, ComponentUseCaseImpl},
    feeder::{FeederUseCase, FeederUseCaseImpl},
    jobdefinition::{JobdefinitionUseCase, JobdefinitionUseCaseImpl},
    permission::{PermissionUseCase, PermissionUseCaseImpl},
    role::{RoleUseCase, RoleUseCaseImpl},
    team::{TeamUseCase, TeamUseCaseImpl},
    user::{UserUseCase, UserUseCaseImpl},
};

mod bootstrap;
pub(crate) mod ci_test;
pub(crate) mod component;
pub(crate) mod feeder;
pub(crate) mod jobdefinition;
pub(crate) mod permission;
pub(crate) mod role;
pub(crate) mod team;
pub(crate) mod user;

pub(crate) struct Application {
    database_connection: Arc<DatabaseConnection>,
    feeder_service: Arc<dyn FeederService + Sync + Send>,
    jobdefinition_service: Arc<dyn JobdefinitionService + Sync + Send>,
    role_service: Arc<dyn RoleService + Sync + Send>,
    permission_service: Arc<dyn PermissionService + Sync + Send>,
    team_service: Arc<dyn TeamService + Sync + Send>,
    user_service: Arc<dyn UserService + Sync + Send>,
    component_service: Arc<dyn ComponentService + Sync + Send>,
    ci_test_service: Arc<dyn CiTestService + Sync + Send>,
}

impl Application {
    pub fn authenticator(&self) -> Arc<dyn Authenticator + Sync + Send> {
        Arc::new(PostgresAuthenticator::new(self.database_connection.clone()))
    }

    pub fn jobdefinition(&self) -> impl JobdefinitionUseCase {
        JobdefinitionUseCaseImpl::new(self.database_connection.clone(), self.jobdefinition_service.clone())
    }

    pub fn permission(&self) -> impl PermissionUseCase {
        PermissionUseCaseImpl::new(self.database_connection.clone(), self.permission_service.clone())
    }

    pub fn component(&self) -> impl ComponentUseCase {
        ComponentUseCaseImpl::new(self.database_connection.clone(), self.component_service.clone())
    }

    pub fn ci_test(&self) -> impl CiTestUseCase {
        CiTestUseCaseImpl::new(self.database_connection.clone(), self.ci_test_service.clone())
    }

    pub fn as_principal(&self, principal: &Principal) -> ApplicationWithPrincipal {
        ApplicationWithPrincipal {
            principal: principal.clone(),
            database_connection: self.database_connection.clone(),
            feeder_service: self.feeder_service.clone(),
            role_service: self.role_service.clone(),
            team_service: self.team_service.clone(),
            user_service: self.user_service.clone(),
        }
    }
}

/// Use cases whose outcome depends on who is asking.
pub(crate) struct ApplicationWithPrincipal {
    principal: Principal,
    database_connection: Arc<DatabaseConnection>,
    feeder_service: Arc<dyn FeederService + Sync + Send>,
    role_service: Arc<dyn RoleService + Sync + Send>,
    team_service: Arc<dyn TeamService + Sync + Send>,
    user_service: Arc<dyn UserService + Sync + Send>,
}

impl ApplicationWithPrincipal {
    pub fn feeder(&self) -> impl FeederUseCase {
        FeederUseCaseImpl::new(self.principal.clone(), self.database_connection.clone(), self.feeder_service.clone())
    }

    pub fn role(&self) -> impl RoleUseCase {
        RoleUseCaseImpl::new(self.principal.clone(), self.database_connection.clone(), self.role_service.clone())
    }

    pub fn team(&self) -> impl TeamUseCase {
        TeamUseCaseImpl::new(self.principal.clone(), self.database_connection.clone(), self.team_service.clone())
    }

    pub fn user(&self) -> impl UserUseCase {
        UserUseCaseImpl::new(self.principal.clone(), self.database_connection.clone(), self.user_service.clone())
    }
}

pub(super) async fn init(config: &ApplicationConfig) -> anyhow::Result<Application> {
    let database_connection = init_database_connection(config).await?;
    database::migrate(database_connection.as_ref()).await?;

    let application = Application {
        database_connection,
        feeder_service: Arc::new(PostgresFeederService),
        jobdefinition_service: Arc::new(PostgresJobdefinitionService),
        role_service: Arc::new(PostgresRoleService),
        permission_service: Arc::new(PostgresPermissionService),
        team_service: Arc::new(PostgresTeamService),
        user_service: Arc::new(PostgresUserService),
        component_service: Arc::new(PostgresComponentService),
        ci_test_service: Arc::new(PostgresCiTestService),
    };

    bootstrap::run(&application, &config.bootstrap).await?;

    Ok(application)
}

async fn init_database_connection(config: &ApplicationConfig) -> anyhow::Result<Arc<DatabaseConnection>> {
    let credential = DatabaseCredential {
        username: config.database.auth.username.to_owned(),
        password: config.database.auth.password.to_owned(),
    };

    connect_to_database(&config.database.host, config.database.port, &config.database.database_name, &credential).await
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;

    use sea_orm::{DatabaseBackend, MockDatabase};
    use tally_auth::{Principal, RoleLabel};
    use uuid::Uuid;

    use super::Application;
    use crate::domain::{
        ci_test::PostgresCiTestService, component::PostgresComponentService, feeder::PostgresFeederService,
        identity::PostgresUserService, jobdefinition::PostgresJobdefinitionService,
        permission::PostgresPermissionService, role::PostgresRoleService, team::PostgresTeamService,
    };

    /// An application whose storage answers nothing; for requests rejected before reaching it.
    pub(crate) fn detached_application() -> Application {
        Application {
            database_connection: Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection()),
            feeder_service: Arc::new(PostgresFeederService),
            jobdefinition_service: Arc::new(PostgresJobdefinitionService),
            role_service: Arc::new(PostgresRoleService),
            permission_service: Arc::new(PostgresPermissionService),
            team_service: Arc::new(PostgresTeamService),
            user_service: Arc::new(PostgresUserService),
            component_service: Arc::new(PostgresComponentService),
            ci_test_service: Arc::new(PostgresCiTestService),
        }
    }

    pub(crate) fn principal(role: RoleLabel, team_id: Uuid) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "tester".to_owned(),
            role_id: Uuid::new_v4(),
            role,
            team_id,
            teams: vec![team_id],
        }
    }
}
