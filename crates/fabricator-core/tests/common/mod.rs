//! Record types shared by the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use fabricator_core::{Model, Schema};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
	pub id: i64,
	pub name: String,
	pub nick_name: String,
	pub age: i32,
	pub country: String,
	pub birth_time: DateTime<Utc>,
	pub now: DateTime<Utc>,
	pub blogs: Vec<Blog>,
}

impl Model for User {
	fn schema(schema: Schema<Self>) -> Schema<Self> {
		schema
			.column("id", "id,primary", |u| &u.id, |u| &mut u.id)
			.column("name", "", |u| &u.name, |u| &mut u.name)
			.column("nick_name", "", |u| &u.nick_name, |u| &mut u.nick_name)
			.column("age", "", |u| &u.age, |u| &mut u.age)
			.column("country", "", |u| &u.country, |u| &mut u.country)
			.field("birth_time", |u| &u.birth_time, |u| &mut u.birth_time)
			.field("now", |u| &u.now, |u| &mut u.now)
			.field("blogs", |u| &u.blogs, |u| &mut u.blogs)
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blog {
	pub id: i64,
	pub title: String,
	pub content: String,
	pub author_id: i64,
	pub author: Option<Box<User>>,
}

impl Model for Blog {
	fn schema(schema: Schema<Self>) -> Schema<Self> {
		schema
			.column("id", "id,primary", |b| &b.id, |b| &mut b.id)
			.column("title", "", |b| &b.title, |b| &mut b.title)
			.column("content", "", |b| &b.content, |b| &mut b.content)
			.column("author_id", "", |b| &b.author_id, |b| &mut b.author_id)
			.optional("author", |b| &b.author, |b| &mut b.author)
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
	pub id: i64,
	pub text: String,
	pub blog_id: i64,
	pub user_id: i64,
}

impl Model for Comment {
	fn schema(schema: Schema<Self>) -> Schema<Self> {
		schema
			.field("id", |c| &c.id, |c| &mut c.id)
			.field("text", |c| &c.text, |c| &mut c.text)
			.field("blog_id", |c| &c.blog_id, |c| &mut c.blog_id)
			.field("user_id", |c| &c.user_id, |c| &mut c.user_id)
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relation {
	pub author: Option<Box<User>>,
}

impl Model for Relation {
	fn schema(schema: Schema<Self>) -> Schema<Self> {
		schema.optional("author", |r| &r.author, |r| &mut r.author)
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Commentary {
	pub id: i64,
	pub title: String,
	pub author_id: i64,
	pub r: Option<Box<Relation>>,
	pub comment: Option<Box<Comment>>,
}

impl Model for Commentary {
	fn schema(schema: Schema<Self>) -> Schema<Self> {
		schema
			.field("id", |c| &c.id, |c| &mut c.id)
			.field("title", |c| &c.title, |c| &mut c.title)
			.field("author_id", |c| &c.author_id, |c| &mut c.author_id)
			.optional("r", |c| &c.r, |c| &mut c.r)
			.optional("comment", |c| &c.comment, |c| &mut c.comment)
	}
}

/// Persisted with a database-assigned key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Member {
	pub id: Option<i64>,
	pub name: String,
	pub level: i32,
}

impl Model for Member {
	fn schema(schema: Schema<Self>) -> Schema<Self> {
		schema
			.column("id", "id,primary", |m| &m.id, |m| &mut m.id)
			.column("name", "", |m| &m.name, |m| &mut m.name)
			.column("level", "", |m| &m.level, |m| &mut m.level)
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Note {
	pub id: i64,
	pub body: String,
	pub member_id: Option<i64>,
	pub member: Option<Box<Member>>,
}

impl Model for Note {
	fn schema(schema: Schema<Self>) -> Schema<Self> {
		schema
			.column("id", "id,primary", |n| &n.id, |n| &mut n.id)
			.column("body", "", |n| &n.body, |n| &mut n.body)
			.column("member_id", "", |n| &n.member_id, |n| &mut n.member_id)
			.optional("member", |n| &n.member, |n| &mut n.member)
	}
}

pub const SCHEMA_SQL: &[&str] = &[
	"CREATE TABLE member (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, \
	 level INTEGER NOT NULL)",
	"CREATE TABLE note (id INTEGER PRIMARY KEY, body TEXT NOT NULL, member_id INTEGER)",
	"CREATE TABLE user (id INTEGER PRIMARY KEY, name TEXT NOT NULL, nick_name TEXT NOT NULL, \
	 age INTEGER NOT NULL, country TEXT NOT NULL)",
	"CREATE TRIGGER member_level AFTER INSERT ON member WHEN NEW.level = 0 \
	 BEGIN UPDATE member SET level = 1 WHERE id = NEW.id; END",
];
