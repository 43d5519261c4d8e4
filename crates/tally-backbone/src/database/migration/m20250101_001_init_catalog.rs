use async_trait::async_trait;
use sea_orm_migration::{prelude::*, schema::*};

const NAME_LENGTH: u32 = 255;
const ETAG_LENGTH: u32 = 32;
const API_SECRET_LENGTH: u32 = 64;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
pub enum Team {
    #[sea_orm(iden = "teams")]
    Table,
    Id,
    Name,
    ParentId,
    State,
    Etag,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Role {
    #[sea_orm(iden = "roles")]
    Table,
    Id,
    Name,
    Label,
    Description,
    State,
    Etag,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Permission {
    #[sea_orm(iden = "permissions")]
    Table,
    Id,
    Name,
    Label,
    Description,
    State,
    Etag,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum RolePermission {
    #[sea_orm(iden = "role_permissions")]
    Table,
    RoleId,
    PermissionId,
}

#[derive(DeriveIden)]
pub enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Name,
    Password,
    RoleId,
    TeamId,
    State,
    Etag,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Feeder {
    #[sea_orm(iden = "feeders")]
    Table,
    Id,
    Name,
    TeamId,
    ApiSecret,
    RoleId,
    Data,
    State,
    Etag,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Test {
    #[sea_orm(iden = "tests")]
    Table,
    Id,
    Name,
    State,
    Etag,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Component {
    #[sea_orm(iden = "components")]
    Table,
    Id,
    Name,
    Type,
    State,
    Etag,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Jobdefinition {
    #[sea_orm(iden = "jobdefinitions")]
    Table,
    Id,
    Name,
    TestId,
    Etag,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum JobdefinitionComponent {
    #[sea_orm(iden = "jobdefinition_components")]
    Table,
    JobdefinitionId,
    ComponentId,
}

fn state<T: IntoIden>(col: T) -> ColumnDef {
    string_len(col, 20).default("active").take()
}

#[async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Team::Table)
                    .if_not_exists()
                    .col(uuid(Team::Id).primary_key())
                    .col(string_len_uniq(Team::Name, NAME_LENGTH))
                    .col(uuid_null(Team::ParentId))
                    .col(state(Team::State))
                    .col(string_len(Team::Etag, ETAG_LENGTH))
                    .col(timestamp_with_time_zone(Team::CreatedAt))
                    .col(timestamp_with_time_zone(Team::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_teams_parent_id")
                            .from(Team::Table, Team::ParentId)
                            .to(Team::Table, Team::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .take(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Role::Table)
                    .if_not_exists()
                    .col(uuid(Role::Id).primary_key())
                    .col(string_len(Role::Name, NAME_LENGTH))
                    .col(string_len_uniq(Role::Label, NAME_LENGTH))
                    .col(text_null(Role::Description))
                    .col(state(Role::State))
                    .col(string_len(Role::Etag, ETAG_LENGTH))
                    .col(timestamp_with_time_zone(Role::CreatedAt))
                    .col(timestamp_with_time_zone(Role::UpdatedAt))
                    .take(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Permission::Table)
                    .if_not_exists()
                    .col(uuid(Permission::Id).primary_key())
                    .col(string_len(Permission::Name, NAME_LENGTH))
                    .col(string_len_uniq(Permission::Label, NAME_LENGTH))
                    .col(text_null(Permission::Description))
                    .col(state(Permission::State))
                    .col(string_len(Permission::Etag, ETAG_LENGTH))
                    .col(timestamp_with_time_zone(Permission::CreatedAt))
                    .col(timestamp_with_time_zone(Permission::UpdatedAt))
                    .take(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(RolePermission::Table)
                    .if_not_exists()
                    .col(uuid(RolePermission::RoleId))
                    .col(uuid(RolePermission::PermissionId))
                    .primary_key(Index::create().col(RolePermission::RoleId).col(RolePermission::PermissionId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_permissions_role_id")
                            .from(RolePermission::Table, RolePermission::RoleId)
                            .to(Role::Table, Role::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_permissions_permission_id")
                            .from(RolePermission::Table, RolePermission::PermissionId)
                            .to(Permission::Table, Permission::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .take(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len_uniq(User::Name, NAME_LENGTH))
                    .col(text(User::Password))
                    .col(uuid(User::RoleId))
                    .col(uuid(User::TeamId))
                    .col(state(User::State))
                    .col(string_len(User::Etag, ETAG_LENGTH))
                    .col(timestamp_with_time_zone(User::CreatedAt))
                    .col(timestamp_with_time_zone(User::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_role_id")
                            .from(User::Table, User::RoleId)
                            .to(Role::Table, Role::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_team_id")
                            .from(User::Table, User::TeamId)
                            .to(Team::Table, Team::Id),
                    )
                    .take(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Feeder::Table)
                    .if_not_exists()
                    .col(uuid(Feeder::Id).primary_key())
                    .col(string_len(Feeder::Name, NAME_LENGTH))
                    .col(uuid(Feeder::TeamId))
                    .col(char_len(Feeder::ApiSecret, API_SECRET_LENGTH))
                    .col(uuid(Feeder::RoleId))
                    .col(json_binary(Feeder::Data))
                    .col(state(Feeder::State))
                    .col(string_len(Feeder::Etag, ETAG_LENGTH))
                    .col(timestamp_with_time_zone(Feeder::CreatedAt))
                    .col(timestamp_with_time_zone(Feeder::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feeders_team_id")
                            .from(Feeder::Table, Feeder::TeamId)
                            .to(Team::Table, Team::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feeders_role_id")
                            .from(Feeder::Table, Feeder::RoleId)
                            .to(Role::Table, Role::Id),
                    )
                    .take(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Feeder::Table)
                    .if_not_exists()
                    .name("uniq_feeders_name_team_id")
                    .col(Feeder::Name)
                    .col(Feeder::TeamId)
                    .unique()
                    .take(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Test::Table)
                    .if_not_exists()
                    .col(uuid(Test::Id).primary_key())
                    .col(string_len_uniq(Test::Name, NAME_LENGTH))
                    .col(state(Test::State))
                    .col(string_len(Test::Etag, ETAG_LENGTH))
                    .col(timestamp_with_time_zone(Test::CreatedAt))
                    .col(timestamp_with_time_zone(Test::UpdatedAt))
                    .take(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Component::Table)
                    .if_not_exists()
                    .col(uuid(Component::Id).primary_key())
                    .col(string_len_uniq(Component::Name, NAME_LENGTH))
                    .col(string_len(Component::Type, NAME_LENGTH))
                    .col(state(Component::State))
                    .col(string_len(Component::Etag, ETAG_LENGTH))
                    .col(timestamp_with_time_zone(Component::CreatedAt))
                    .col(timestamp_with_time_zone(Component::UpdatedAt))
                    .take(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Jobdefinition::Table)
                    .if_not_exists()
                    .col(uuid(Jobdefinition::Id).primary_key())
                    .col(string_len_uniq(Jobdefinition::Name, NAME_LENGTH))
                    .col(uuid(Jobdefinition::TestId))
                    .col(string_len(Jobdefinition::Etag, ETAG_LENGTH))
                    .col(timestamp_with_time_zone(Jobdefinition::CreatedAt))
                    .col(timestamp_with_time_zone(Jobdefinition::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_jobdefinitions_test_id")
                            .from(Jobdefinition::Table, Jobdefinition::TestId)
                            .to(Test::Table, Test::Id),
                    )
                    .take(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(JobdefinitionComponent::Table)
                    .if_not_exists()
                    .col(uuid(JobdefinitionComponent::JobdefinitionId))
                    .col(uuid(JobdefinitionComponent::ComponentId))
                    .primary_key(
                        Index::create()
                            .col(JobdefinitionComponent::JobdefinitionId)
                            .col(JobdefinitionComponent::ComponentId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_jobdefinition_components_jobdefinition_id")
                            .from(JobdefinitionComponent::Table, JobdefinitionComponent::JobdefinitionId)
                            .to(Jobdefinition::Table, Jobdefinition::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_jobdefinition_components_component_id")
                            .from(JobdefinitionComponent::Table, JobdefinitionComponent::ComponentId)
                            .to(Component::Table, Component::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .take(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            JobdefinitionComponent::Table.into_iden(),
            Jobdefinition::Table.into_iden(),
            Component::Table.into_iden(),
            Test::Table.into_iden(),
            Feeder::Table.into_iden(),
            User::Table.into_iden(),
            RolePermission::Table.into_iden(),
            Permission::Table.into_iden(),
            Role::Table.into_iden(),
            Team::Table.into_iden(),
        ] {
            manager.drop_table(Table::drop().table(table).if_exists().take()).await?;
        }
        Ok(())
    }
}
