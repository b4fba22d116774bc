use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::category::{self, Entity as CategoryEntity, Model as CategoryModel};
use crate::errors::ServiceError;

/// Surfaced when the stored hierarchy itself is broken. Write paths reject
/// cycles up front, so hitting this means the data was corrupted out of band.
const CYCLE_MESSAGE: &str = "Category hierarchy contains a cycle";

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "Category name is required"))]
    pub name: String,
    pub parent_id: Option<Uuid>,
}

/// Partial update. A missing `parent_id` keeps the current parent while an
/// explicit `null` moves the category to the root level.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, message = "Category name must not be empty"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryModel> for CategoryResponse {
    fn from(model: CategoryModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            parent_id: model.parent_id,
            created_at: model.created_at,
        }
    }
}

/// A category with its descendants nested under `children`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryTreeNode {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[schema(no_recursion)]
    pub children: Vec<CategoryTreeNode>,
}

impl CategoryTreeNode {
    fn from_model(model: CategoryModel, children: Vec<CategoryTreeNode>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            parent_id: model.parent_id,
            created_at: model.created_at,
            children,
        }
    }
}

/// Derives a URL slug from a display name: lowercase, whitespace runs
/// collapsed to single hyphens, everything outside `[a-z0-9-]` dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for c in name.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                slug.push('-');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_alphanumeric() || c == '-' {
            slug.push(c);
        }
    }
    slug
}

#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn fetch_all_ordered(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        let db = &*self.db_pool;

        CategoryEntity::find()
            .order_by_asc(category::Column::Name)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch categories from database");
                ServiceError::DatabaseError(e)
            })
    }

    /// Returns every category as a flat list ordered by name.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<CategoryResponse>, ServiceError> {
        let rows = self.fetch_all_ordered().await?;
        Ok(rows.into_iter().map(CategoryResponse::from).collect())
    }

    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn get_category(
        &self,
        category_id: Uuid,
    ) -> Result<Option<CategoryResponse>, ServiceError> {
        let db = &*self.db_pool;

        let found = CategoryEntity::find_by_id(category_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, category_id = %category_id, "Failed to fetch category from database");
                ServiceError::DatabaseError(e)
            })?;

        Ok(found.map(CategoryResponse::from))
    }

    /// Returns the whole hierarchy as a forest of nested nodes. Children are
    /// ordered by name on every level.
    #[instrument(skip(self))]
    pub async fn category_tree(&self) -> Result<Vec<CategoryTreeNode>, ServiceError> {
        let rows = self.fetch_all_ordered().await?;
        assemble_tree(rows)
    }

    #[instrument(skip(self, request))]
    pub async fn create_category(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<CategoryResponse, ServiceError> {
        request.validate().map_err(|e| {
            warn!(error = %e, "Invalid category creation request");
            ServiceError::ValidationError(e.to_string())
        })?;

        let db = &*self.db_pool;

        // A fresh id cannot close a cycle, so only the parent needs checking.
        if let Some(parent_id) = request.parent_id {
            assert_parent_assignable(db, None, parent_id).await?;
        }

        let slug = slugify(&request.name);
        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            slug: Set(slug),
            parent_id: Set(request.parent_id),
            created_at: Set(Utc::now()),
        };

        let created = model.insert(db).await.map_err(|e| {
            error!(error = %e, "Failed to create category in database");
            ServiceError::DatabaseError(e)
        })?;

        info!(category_id = %created.id, slug = %created.slug, "Category created successfully");
        Ok(CategoryResponse::from(created))
    }

    /// Applies a partial update. Renaming re-derives the slug and a parent
    /// change re-runs the cycle check against the new ancestor chain.
    #[instrument(skip(self, request), fields(category_id = %category_id))]
    pub async fn update_category(
        &self,
        category_id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<CategoryResponse, ServiceError> {
        request.validate().map_err(|e| {
            warn!(error = %e, "Invalid category update request");
            ServiceError::ValidationError(e.to_string())
        })?;

        let db = &*self.db_pool;

        let existing = CategoryEntity::find_by_id(category_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, category_id = %category_id, "Failed to fetch category from database");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                warn!(category_id = %category_id, "Category not found for update");
                ServiceError::NotFound("Category not found".to_string())
            })?;

        if request.name.is_none() && request.parent_id.is_none() {
            return Ok(CategoryResponse::from(existing));
        }

        if let Some(Some(new_parent)) = request.parent_id {
            assert_parent_assignable(db, Some(category_id), new_parent).await?;
        }

        let mut active: category::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.slug = Set(slugify(&name));
            active.name = Set(name);
        }
        if let Some(parent_change) = request.parent_id {
            active.parent_id = Set(parent_change);
        }

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, category_id = %category_id, "Failed to update category in database");
            ServiceError::DatabaseError(e)
        })?;

        info!(category_id = %updated.id, "Category updated successfully");
        Ok(CategoryResponse::from(updated))
    }

    /// Deletes a category. Its direct children are reparented to the deleted
    /// node's own parent so no subtree is orphaned.
    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for category deletion");
            ServiceError::DatabaseError(e)
        })?;

        let node = CategoryEntity::find_by_id(category_id)
            .one(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, category_id = %category_id, "Failed to fetch category from database");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                warn!(category_id = %category_id, "Category not found for deletion");
                ServiceError::NotFound("Category not found".to_string())
            })?;

        CategoryEntity::update_many()
            .col_expr(category::Column::ParentId, Expr::value(node.parent_id))
            .filter(category::Column::ParentId.eq(category_id))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, category_id = %category_id, "Failed to reparent child categories");
                ServiceError::DatabaseError(e)
            })?;

        CategoryEntity::delete_by_id(category_id)
            .exec(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, category_id = %category_id, "Failed to delete category from database");
                ServiceError::DatabaseError(e)
            })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, category_id = %category_id, "Failed to commit category deletion");
            ServiceError::DatabaseError(e)
        })?;

        info!(category_id = %category_id, "Category deleted successfully");
        Ok(())
    }
}

/// Verifies that `parent` may become the parent of `child`. The parent row
/// must exist and walking its ancestor chain must neither reach `child` nor
/// revisit a node. `child` is `None` when creating, since a fresh id cannot
/// appear in any existing chain.
async fn assert_parent_assignable<C: ConnectionTrait>(
    conn: &C,
    child: Option<Uuid>,
    parent: Uuid,
) -> Result<(), ServiceError> {
    if child == Some(parent) {
        return Err(ServiceError::ValidationError(
            "A category cannot be its own parent".to_string(),
        ));
    }

    let parent_row = CategoryEntity::find_by_id(parent)
        .one(conn)
        .await?
        .ok_or_else(|| {
            warn!(parent_id = %parent, "Rejected assignment to nonexistent parent category");
            ServiceError::ValidationError("Parent category does not exist".to_string())
        })?;

    let mut visited = HashSet::from([parent]);
    let mut cursor = parent_row.parent_id;
    while let Some(ancestor_id) = cursor {
        if Some(ancestor_id) == child {
            warn!(parent_id = %parent, "Rejected parent assignment that would close a cycle");
            return Err(ServiceError::ValidationError(
                "Parent assignment would create a category cycle".to_string(),
            ));
        }
        if !visited.insert(ancestor_id) {
            error!(parent_id = %parent, ancestor_id = %ancestor_id, "{}", CYCLE_MESSAGE);
            return Err(ServiceError::InternalError(CYCLE_MESSAGE.to_string()));
        }
        cursor = match CategoryEntity::find_by_id(ancestor_id).one(conn).await? {
            Some(row) => row.parent_id,
            // A dangling parent pointer acts as a root boundary.
            None => None,
        };
    }

    Ok(())
}

/// Builds the nested forest from a flat row set without recursion. Rows must
/// arrive in the order children should appear in; sibling buckets preserve it.
/// Rows whose parent is not part of the set surface as roots. Any row left
/// unvisited after the walk sits on a cycle, which is reported as an internal
/// error rather than silently dropped.
fn assemble_tree(rows: Vec<CategoryModel>) -> Result<Vec<CategoryTreeNode>, ServiceError> {
    let known: HashSet<Uuid> = rows.iter().map(|row| row.id).collect();
    let total = rows.len();

    let mut by_parent: HashMap<Option<Uuid>, Vec<CategoryModel>> = HashMap::new();
    for row in rows {
        let parent = row.parent_id.filter(|pid| known.contains(pid));
        by_parent.entry(parent).or_default().push(row);
    }

    struct Frame {
        node: CategoryModel,
        pending: Vec<CategoryModel>,
        built: Vec<CategoryTreeNode>,
    }

    let mut visited: HashSet<Uuid> = HashSet::with_capacity(total);
    let mut forest = Vec::new();

    for root in by_parent.remove(&None).unwrap_or_default() {
        if !visited.insert(root.id) {
            return Err(ServiceError::InternalError(CYCLE_MESSAGE.to_string()));
        }
        let pending = take_children(&mut by_parent, root.id);
        let mut stack = vec![Frame {
            node: root,
            pending,
            built: Vec::new(),
        }];

        while let Some(mut frame) = stack.pop() {
            if let Some(child) = frame.pending.pop() {
                stack.push(frame);
                if !visited.insert(child.id) {
                    return Err(ServiceError::InternalError(CYCLE_MESSAGE.to_string()));
                }
                let pending = take_children(&mut by_parent, child.id);
                stack.push(Frame {
                    node: child,
                    pending,
                    built: Vec::new(),
                });
            } else {
                let node = CategoryTreeNode::from_model(frame.node, frame.built);
                match stack.last_mut() {
                    Some(parent) => parent.built.push(node),
                    None => forest.push(node),
                }
            }
        }
    }

    // Rows chained into a loop never reach a root and stay unvisited.
    if visited.len() != total {
        return Err(ServiceError::InternalError(CYCLE_MESSAGE.to_string()));
    }

    Ok(forest)
}

fn take_children(
    by_parent: &mut HashMap<Option<Uuid>, Vec<CategoryModel>>,
    id: Uuid,
) -> Vec<CategoryModel> {
    let mut children = by_parent.remove(&Some(id)).unwrap_or_default();
    // Popped back to front, so reverse to restore the input order.
    children.reverse();
    children
}
