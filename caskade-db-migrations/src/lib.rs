use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use sea_orm_migration::MigrationTrait;

mod m00001_create_user;
mod m00002_create_login_attempt;
mod m00003_create_ticket_granting_ticket;
mod m00004_create_service_ticket;
mod m00005_create_two_factor_authenticator;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m00001_create_user::Migration),
            Box::new(m00002_create_login_attempt::Migration),
            Box::new(m00003_create_ticket_granting_ticket::Migration),
            Box::new(m00004_create_service_ticket::Migration),
            Box::new(m00005_create_two_factor_authenticator::Migration),
        ]
    }
}

pub async fn migrate_database(connection: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(connection, None).await
}
