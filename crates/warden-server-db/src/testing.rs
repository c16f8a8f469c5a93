// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fixtures for tests in this crate and, behind the `test-support` feature,
//! in the crates built on top of it.

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use warden_server_auth::{Operator, OperatorId, OperatorRole, User, UserId};

use crate::migrations::run_migrations;
use crate::operator::OperatorRepository;
use crate::user::UserRepository;

/// In-memory database with every migration applied. A single connection
/// keeps all queries on the same in-memory database.
pub async fn create_test_pool() -> SqlitePool {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect(":memory:")
		.await
		.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}

pub fn make_user(email: &str) -> User {
	let now = Utc::now();
	User {
		id: UserId::generate(),
		email: email.to_string(),
		display_name: email.split('@').next().unwrap_or(email).to_string(),
		created_at: now,
		updated_at: now,
		deleted_at: None,
	}
}

pub fn make_operator(email: &str, role: OperatorRole) -> Operator {
	let now = Utc::now();
	Operator {
		id: OperatorId::generate(),
		email: email.to_string(),
		display_name: email.split('@').next().unwrap_or(email).to_string(),
		role,
		is_active: true,
		created_at: now,
		updated_at: now,
	}
}

pub async fn insert_user(pool: &SqlitePool, email: &str) -> User {
	let user = make_user(email);
	UserRepository::new(pool.clone())
		.create_user(&user, None)
		.await
		.unwrap();
	user
}

pub async fn insert_operator(pool: &SqlitePool, email: &str, role: OperatorRole) -> Operator {
	let operator = make_operator(email, role);
	OperatorRepository::new(pool.clone())
		.create_operator(&operator, None)
		.await
		.unwrap();
	operator
}
