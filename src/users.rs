//! The user endpoints' request shapes and the queries they run.

use crate::case::to_snake_case;
use crate::error::AppError;
use crate::relation::Selection;
use crate::schema::USER;
use crate::sql::{Aggregate, CompareOp, Filter, GroupedRead, JoinKind, JoinedRead, OrderBy, ReadQuery, SortDirection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Columns returned by update and delete.
pub const USER_PROJECTION: &[&str] = &["id", "name", "age", "email", "role"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Basic,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Basic => "BASIC",
        }
    }
}

fn required(field: &str) -> AppError {
    AppError::BadRequest(format!("{} is required", field))
}

/// Body of `PUT /user`. Fields are optional at the type level so a missing one is a 400
/// naming the field rather than a deserialization error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl CreateUser {
    /// Column values for the insert; role is left to its column default when absent.
    pub fn into_fields(self) -> Result<HashMap<String, Value>, AppError> {
        let name = self.name.ok_or_else(|| required("name"))?;
        let age = self.age.ok_or_else(|| required("age"))?;
        let email = self.email.ok_or_else(|| required("email"))?;
        let mut fields = HashMap::from([
            ("name".to_string(), json!(name)),
            ("age".to_string(), json!(age)),
            ("email".to_string(), json!(email)),
        ]);
        if let Some(role) = self.role {
            fields.insert("role".into(), json!(role.as_str()));
        }
        Ok(fields)
    }
}

/// Body of `POST /user`. Only the fields present are written; `age: 0` is a real update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UpdateUser {
    pub fn into_changes(self) -> Result<(Uuid, HashMap<String, Value>), AppError> {
        let id = self.id.ok_or_else(|| required("id"))?;
        let mut changes = HashMap::new();
        if let Some(name) = self.name {
            changes.insert("name".to_string(), json!(name));
        }
        if let Some(age) = self.age {
            changes.insert("age".to_string(), json!(age));
        }
        if let Some(email) = self.email {
            changes.insert("email".to_string(), json!(email));
        }
        if let Some(role) = self.role {
            changes.insert("role".to_string(), json!(role.as_str()));
        }
        Ok((id, changes))
    }
}

/// Body of `DELETE /user`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteUser {
    pub id: Option<Uuid>,
}

impl DeleteUser {
    pub fn id(&self) -> Result<Uuid, AppError> {
        self.id.ok_or_else(|| required("id"))
    }
}

/// Query string of `GET /users`. Every parameter is optional; the defaults reproduce the
/// fixed listing: ages 20 to 25 by ascending age, skip one, take five.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersParams {
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    /// Column to sort by, camelCase.
    pub sort: Option<String>,
    pub order: Option<SortDirection>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListUsersParams {
    pub fn to_query(&self) -> ReadQuery {
        let sort = self.sort.as_deref().map(to_snake_case).unwrap_or_else(|| "age".into());
        ReadQuery::new(USER)
            .select(nested_user_selection())
            .filter(Filter::between("age", self.min_age.unwrap_or(20), self.max_age.unwrap_or(25)))
            .order_by(OrderBy {
                column: sort,
                direction: self.order.unwrap_or_default(),
            })
            .limit(self.limit.unwrap_or(5))
            .offset(self.offset.unwrap_or(1))
    }
}

/// Name and age of each user, their email preference, and their posts with category links.
pub fn nested_user_selection() -> Selection {
    Selection::columns(&["name", "age"])
        .with("preferences", Selection::columns(&["email_updates"]))
        .with("posts", Selection::all().with("postCategories", Selection::all()))
}

/// Users side by side with their email preference (null without a preferences row).
pub fn users_with_preferences() -> JoinedRead {
    JoinedRead {
        entity: USER.into(),
        columns: vec!["id".into(), "age".into()],
        relation: "preferences".into(),
        joined_columns: vec!["email_updates".into()],
        kind: JoinKind::Left,
        filter: None,
    }
}

/// Names shared by more than one user, with how many users carry each.
pub fn shared_names() -> GroupedRead {
    GroupedRead {
        entity: USER.into(),
        group_by: vec!["name".into()],
        aggregate: Aggregate::Count("id".into()),
        alias: "count".into(),
        having: Some((CompareOp::Gt, json!(1))),
        filter: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_name_age_and_email() {
        let body: CreateUser = serde_json::from_value(json!({"name": "Alice", "email": "a@x.com"})).unwrap();
        let err = body.into_fields().unwrap_err();
        assert_eq!(err.to_string(), "bad request: age is required");
    }

    #[test]
    fn create_leaves_role_to_default() {
        let body: CreateUser =
            serde_json::from_value(json!({"name": "Alice", "age": 30, "email": "a@x.com"})).unwrap();
        let fields = body.into_fields().unwrap();
        assert_eq!(fields.len(), 3);
        assert!(!fields.contains_key("role"));
    }

    #[test]
    fn role_must_be_a_known_value() {
        assert!(serde_json::from_value::<CreateUser>(json!({"role": "ROOT"})).is_err());
        let body: CreateUser = serde_json::from_value(json!({"role": "ADMIN"})).unwrap();
        assert_eq!(body.role, Some(Role::Admin));
    }

    #[test]
    fn update_keeps_falsy_values_and_drops_absent_ones() {
        let id = Uuid::new_v4();
        let body: UpdateUser = serde_json::from_value(json!({"id": id, "age": 0, "name": ""})).unwrap();
        let (got, changes) = body.into_changes().unwrap();
        assert_eq!(got, id);
        assert_eq!(changes.get("age"), Some(&json!(0)));
        assert_eq!(changes.get("name"), Some(&json!("")));
        assert!(!changes.contains_key("email"));
        assert!(!changes.contains_key("role"));
    }

    #[test]
    fn update_and_delete_require_id() {
        let body: UpdateUser = serde_json::from_value(json!({"age": 22})).unwrap();
        assert_eq!(body.into_changes().unwrap_err().to_string(), "bad request: id is required");
        assert!(DeleteUser::default().id().is_err());
    }

    #[test]
    fn list_defaults_match_fixed_listing() {
        let q = ListUsersParams::default().to_query();
        assert_eq!(q.filter, Some(Filter::between("age", 20, 25)));
        assert_eq!(q.order_by, vec![OrderBy::asc("age")]);
        assert_eq!((q.limit, q.offset), (Some(5), Some(1)));
    }

    #[test]
    fn list_sort_accepts_camel_case_columns() {
        let params: ListUsersParams =
            serde_json::from_value(json!({"sort": "email", "order": "desc", "minAge": 18})).unwrap();
        let q = params.to_query();
        assert_eq!(q.order_by, vec![OrderBy::desc("email")]);
        assert_eq!(q.filter, Some(Filter::between("age", 18, 25)));
    }
}
