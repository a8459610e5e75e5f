//! End-to-end screen flows through the headless harness
//!
//! Every test mounts a real screen stack over the in-memory backend, presses
//! keys by name and asserts on what the user would see.

use pretty_assertions::assert_eq;
use rbac_console::api::MockApi;
use rbac_console::model::EntityKind;
use rbac_console::tui::{ModeKind, ScreenHarness, ScreenSpec, StatusKind};

fn status_text(h: &ScreenHarness) -> Option<(StatusKind, String)> {
    h.last_status().map(|s| (s.kind, s.message.clone()))
}

async fn roles() -> ScreenHarness {
    ScreenHarness::mount(MockApi::demo(), ScreenSpec::List(EntityKind::Role)).await
}

// =============================================================================
// PAGINATION
// =============================================================================

#[tokio::test]
async fn test_paging_stops_at_last_page() {
    let api = MockApi::new().with_many(EntityKind::Role, "Role", 25);
    let mut h = ScreenHarness::mount_with_page_size(api, ScreenSpec::List(EntityKind::Role), 12).await;
    assert_eq!(h.visible_rows().len(), 12);

    h.press("right").await;
    h.press("right").await;
    assert_eq!(h.visible_rows(), vec!["Role 25".to_string()]);
    assert!(h.render(80, 24).contains("Page 3 of 3"));

    h.press("right").await;
    assert!(h.render(80, 24).contains("Page 3 of 3"));

    h.press("left").await;
    assert!(h.render(80, 24).contains("Page 2 of 3"));
    assert_eq!(h.visible_rows()[0], "Role 13");
}

#[tokio::test]
async fn test_page_change_resets_selection() {
    let api = MockApi::new().with_many(EntityKind::Group, "Group", 20);
    let mut h = ScreenHarness::mount_with_page_size(api, ScreenSpec::List(EntityKind::Group), 12).await;

    h.press("down").await;
    h.press("down").await;
    assert_eq!(h.selected_index(), 2);

    h.press("right").await;
    assert_eq!(h.selected_index(), 0);
}

#[tokio::test]
async fn test_deleting_last_row_of_last_page_clamps() {
    let api = MockApi::new().with_many(EntityKind::Role, "Role", 13);
    let mut h = ScreenHarness::mount_with_page_size(api, ScreenSpec::List(EntityKind::Role), 12).await;

    h.press("right").await;
    assert_eq!(h.visible_rows(), vec!["Role 13".to_string()]);

    h.press("d").await;
    h.press("y").await;

    assert_eq!(h.api().total(EntityKind::Role), 12);
    assert!(h.render(80, 24).contains("Page 1 of 1"));
    assert_eq!(h.visible_rows().len(), 12);
    assert_eq!(h.selected_index(), 0);
}

// =============================================================================
// CREATE
// =============================================================================

#[tokio::test]
async fn test_create_role() {
    let mut h = roles().await;

    h.press("n").await;
    assert_eq!(h.mode(), ModeKind::Create);
    h.type_text("Auditor").await;
    h.press("tab").await;
    h.type_text("Reads everything").await;
    h.press("enter").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Success, "Role created successfully".to_string()))
    );
    assert_eq!(h.mode(), ModeKind::Browse);
    let created = h.api().find_by_name(EntityKind::Role, "Auditor").unwrap();
    assert_eq!(created.description.as_deref(), Some("Reads everything"));
    assert!(h.visible_rows().contains(&"Auditor".to_string()));

    // the list refetches once the create lands, not before
    let calls: Vec<String> = h.api().calls().into_iter().map(|c| c.label).collect();
    assert_eq!(calls, vec!["list roles", "create role", "list roles"]);
}

#[tokio::test]
async fn test_create_requires_name() {
    let mut h = roles().await;

    h.press("n").await;
    h.type_text("   ").await;
    h.press("enter").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Error, "Name is required".to_string()))
    );
    assert_eq!(h.mode(), ModeKind::Create);
    assert_eq!(h.api().count("create"), 0);
}

#[tokio::test]
async fn test_create_duplicate_keeps_form_open() {
    let mut h = roles().await;

    h.press("n").await;
    h.type_text("ops engineer").await;
    h.press("enter").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Error, "Role with this name already exists.".to_string()))
    );
    assert_eq!(h.mode(), ModeKind::Create);

    // the form can be corrected and resubmitted
    h.type_text(" 2").await;
    h.press("enter").await;
    assert_eq!(h.mode(), ModeKind::Browse);
    assert!(h.api().find_by_name(EntityKind::Role, "ops engineer 2").is_some());
}

#[tokio::test]
async fn test_create_cancel_discards_form() {
    let mut h = roles().await;

    h.press("n").await;
    h.type_text("Draft").await;
    h.press("esc").await;

    assert_eq!(h.mode(), ModeKind::Browse);
    assert_eq!(h.api().mutation_count(), 0);
    assert_eq!(h.depth(), 1);
}

// =============================================================================
// DELETE
// =============================================================================

#[tokio::test]
async fn test_delete_system_role_is_refused() {
    let mut h = roles().await;
    assert_eq!(h.visible_rows()[0], "RBAC Administrator");

    h.press("d").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Error, "Cannot delete system roles".to_string()))
    );
    assert_eq!(h.mode(), ModeKind::Browse);
    assert_eq!(h.api().mutation_count(), 0);
}

#[tokio::test]
async fn test_delete_custom_role() {
    let mut h = roles().await;

    h.press("down").await;
    h.press("down").await;
    h.press("d").await;
    assert_eq!(h.mode(), ModeKind::ConfirmDelete);
    assert!(h.render(100, 30).contains("Ops Engineer"));

    h.press("y").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Success, "Role deleted successfully".to_string()))
    );
    assert_eq!(h.mode(), ModeKind::Browse);
    assert!(h.api().entity(EntityKind::Role, "role-ops").is_none());
    assert_eq!(h.visible_rows().len(), 2);
    assert_eq!(h.selected_index(), 1);
}

#[tokio::test]
async fn test_delete_declined() {
    let mut h = roles().await;

    h.press("down").await;
    h.press("down").await;
    h.press("d").await;
    h.press("n").await;

    assert_eq!(h.mode(), ModeKind::Browse);
    assert_eq!(h.api().count("delete"), 0);
}

#[tokio::test]
async fn test_delete_failure_reports_error() {
    let mut h = roles().await;
    h.api().fail_next("delete role", "Role is still bound to a workspace");

    h.press("down").await;
    h.press("down").await;
    h.press("d").await;
    h.press("y").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Error, "Role is still bound to a workspace".to_string()))
    );
    assert_eq!(h.mode(), ModeKind::Browse);
    assert_eq!(h.visible_rows().len(), 3);
}

// =============================================================================
// SEARCH, REFRESH, READ-ONLY
// =============================================================================

#[tokio::test]
async fn test_search_filters_by_name() {
    let mut h = roles().await;

    h.press("/").await;
    assert_eq!(h.mode(), ModeKind::Search);
    h.type_text("  ops ").await;
    h.press("enter").await;

    assert_eq!(h.visible_rows(), vec!["Ops Engineer".to_string()]);
    assert_eq!(h.mode(), ModeKind::Browse);

    // clearing the search brings everything back
    h.press("/").await;
    for _ in 0..6 {
        h.press("backspace").await;
    }
    h.press("enter").await;
    assert_eq!(h.visible_rows().len(), 3);
}

#[tokio::test]
async fn test_empty_search_result() {
    let mut h = roles().await;

    h.press("/").await;
    h.type_text("zzz").await;
    h.press("enter").await;

    assert!(h.visible_rows().is_empty());
    assert!(h.render(80, 24).contains("No roles found"));
}

#[tokio::test]
async fn test_refresh_and_clear_status() {
    let mut h = roles().await;
    let lists_before = h.api().count("list roles");

    h.press("r").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Success, "Refreshed".to_string()))
    );
    assert_eq!(h.api().count("list roles"), lists_before + 1);

    h.clear_last_status();
    assert!(h.last_status().is_none());
}

#[tokio::test]
async fn test_users_list_is_read_only() {
    let mut h = ScreenHarness::mount(MockApi::demo(), ScreenSpec::List(EntityKind::User)).await;
    assert_eq!(h.visible_rows(), vec!["jdoe", "asmith", "kwong"]);

    h.press("n").await;
    h.press("d").await;
    h.press("enter").await;

    assert_eq!(h.mode(), ModeKind::Browse);
    assert_eq!(h.depth(), 1);
    assert_eq!(h.api().mutation_count(), 0);
}

#[tokio::test]
async fn test_ctrl_c_quits_from_form() {
    let mut h = roles().await;

    h.press("n").await;
    h.press("ctrl+c").await;

    assert!(h.should_quit());
}

#[tokio::test]
async fn test_unmapped_keys_change_nothing() {
    let api = MockApi::new().with_many(EntityKind::Role, "Role", 30);
    let mut h = ScreenHarness::mount_with_page_size(api, ScreenSpec::List(EntityKind::Role), 12).await;
    h.press("right").await;
    h.press("down").await;
    let rows = h.visible_rows();

    for key in ["z", "5", "e", "x", "a", "tab", "backspace"] {
        h.press(key).await;
        assert_eq!(h.mode(), ModeKind::Browse, "after {}", key);
        assert_eq!(h.selected_index(), 1, "after {}", key);
        assert_eq!(h.visible_rows(), rows, "after {}", key);
        assert!(h.render(80, 24).contains("Page 2 of 3"), "after {}", key);
    }
    assert!(h.last_status().is_none());
    assert_eq!(h.api().mutation_count(), 0);
}

#[tokio::test]
async fn test_list_load_failure_and_retry() {
    let api = MockApi::demo();
    api.fail_next("list roles", "Service unavailable");
    let mut h = ScreenHarness::mount(api, ScreenSpec::List(EntityKind::Role)).await;

    let screen = h.render(100, 24);
    assert!(screen.contains("Failed to load roles"));
    assert!(screen.contains("Service unavailable"));
    assert!(h.visible_rows().is_empty());

    h.press("r").await;
    assert!(!h.render(100, 24).contains("Failed to load roles"));
    assert_eq!(h.visible_rows()[0], "RBAC Administrator");
}

// =============================================================================
// WORKSPACE TREE
// =============================================================================

#[tokio::test]
async fn test_workspace_drill_down_and_back() {
    let mut h = ScreenHarness::mount(MockApi::demo(), ScreenSpec::List(EntityKind::Workspace)).await;
    assert_eq!(h.visible_rows(), vec!["Root Workspace".to_string()]);

    h.press("enter").await;
    assert_eq!(h.visible_rows(), vec!["Default Workspace".to_string()]);
    h.press("enter").await;
    assert_eq!(h.visible_rows(), vec!["Engineering".to_string()]);
    h.press("enter").await;
    assert_eq!(h.visible_rows(), vec!["Web".to_string()]);
    assert!(h
        .render(120, 24)
        .contains("Root / Root Workspace / Default Workspace / Engineering"));

    h.press("b").await;
    assert_eq!(h.visible_rows(), vec!["Engineering".to_string()]);

    h.press("h").await;
    assert_eq!(h.visible_rows(), vec!["Root Workspace".to_string()]);
    assert_eq!(h.depth(), 1);
}

#[tokio::test]
async fn test_workspace_create_under_current_parent() {
    let mut h = ScreenHarness::mount(MockApi::demo(), ScreenSpec::List(EntityKind::Workspace)).await;

    h.press("enter").await;
    h.press("enter").await;
    h.press("n").await;
    h.type_text("Staging").await;
    h.press("enter").await;

    let created = h.api().find_by_name(EntityKind::Workspace, "Staging").unwrap();
    assert_eq!(created.parent_id.as_deref(), Some("ws-default"));
    assert!(h.visible_rows().contains(&"Staging".to_string()));
}

#[tokio::test]
async fn test_protected_workspaces_cannot_be_deleted() {
    let mut h = ScreenHarness::mount(MockApi::demo(), ScreenSpec::List(EntityKind::Workspace)).await;

    h.press("d").await;
    assert_eq!(
        status_text(&h),
        Some((StatusKind::Error, "Cannot delete root/default workspaces".to_string()))
    );
    assert_eq!(h.mode(), ModeKind::Browse);

    h.clear_last_status();
    h.press("enter").await;
    assert_eq!(h.visible_rows(), vec!["Default Workspace".to_string()]);
    h.press("d").await;
    assert_eq!(
        status_text(&h),
        Some((StatusKind::Error, "Cannot delete root/default workspaces".to_string()))
    );
    assert_eq!(h.mode(), ModeKind::Browse);
    assert_eq!(h.api().mutation_count(), 0);
    assert_eq!(h.api().total(EntityKind::Workspace), 4);
}

#[tokio::test]
async fn test_workspace_inspect_opens_detail() {
    let mut h = ScreenHarness::mount(MockApi::demo(), ScreenSpec::List(EntityKind::Workspace)).await;

    h.press("i").await;
    assert_eq!(h.depth(), 2);
    assert_eq!(h.title(), "Workspace: Root Workspace");

    h.press("esc").await;
    assert_eq!(h.depth(), 1);
}

// =============================================================================
// DETAIL SCREENS
// =============================================================================

#[tokio::test]
async fn test_group_members_add_and_remove() {
    let mut h = ScreenHarness::mount(MockApi::demo(), ScreenSpec::List(EntityKind::Group)).await;

    h.press("down").await;
    h.press("enter").await;
    assert_eq!(h.depth(), 2);
    assert_eq!(h.title(), "Group: Operations");

    h.press("2").await;
    assert_eq!(h.visible_rows(), vec!["jdoe".to_string()]);

    h.press("a").await;
    assert_eq!(h.mode(), ModeKind::AddMember);
    h.press("enter").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Success, "Member added successfully".to_string()))
    );
    assert_eq!(h.mode(), ModeKind::Browse);
    assert_eq!(h.api().members("group-ops"), vec!["jdoe", "asmith"]);
    assert_eq!(h.visible_rows(), vec!["jdoe".to_string(), "asmith".to_string()]);

    h.press("x").await;
    assert_eq!(h.mode(), ModeKind::ConfirmRemove);
    h.press("y").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Success, "Member removed successfully".to_string()))
    );
    assert_eq!(h.api().members("group-ops"), vec!["asmith"]);
}

#[tokio::test]
async fn test_group_roles_picker_lists_unassigned() {
    let mut h =
        ScreenHarness::mount(MockApi::demo(), ScreenSpec::detail(EntityKind::Group, "group-ops")).await;

    h.press("3").await;
    assert_eq!(h.visible_rows(), vec!["Ops Engineer".to_string()]);

    h.press("a").await;
    assert_eq!(h.mode(), ModeKind::AddRole);
    h.press("down").await;
    h.press("enter").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Success, "Role added successfully".to_string()))
    );
    assert_eq!(h.api().group_roles("group-ops"), vec!["role-ops", "role-viewer"]);
}

#[tokio::test]
async fn test_escape_closes_pickers_and_confirm() {
    let mut h =
        ScreenHarness::mount(MockApi::demo(), ScreenSpec::detail(EntityKind::Group, "group-ops")).await;

    h.press("2").await;
    h.press("a").await;
    assert_eq!(h.mode(), ModeKind::AddMember);
    h.press("esc").await;
    assert_eq!(h.mode(), ModeKind::Browse);
    assert_eq!(h.depth(), 1);

    h.press("x").await;
    assert_eq!(h.mode(), ModeKind::ConfirmRemove);
    h.press("esc").await;
    assert_eq!(h.mode(), ModeKind::Browse);

    h.press("3").await;
    h.press("a").await;
    assert_eq!(h.mode(), ModeKind::AddRole);
    h.press("esc").await;
    assert_eq!(h.mode(), ModeKind::Browse);

    assert_eq!(h.api().mutation_count(), 0);
    assert_eq!(h.api().members("group-ops"), vec!["jdoe"]);
    assert_eq!(h.api().group_roles("group-ops"), vec!["role-ops"]);
}

#[tokio::test]
async fn test_members_tab_load_failure() {
    let api = MockApi::demo();
    api.fail_next("list group members", "Service unavailable");
    let mut h = ScreenHarness::mount(api, ScreenSpec::detail(EntityKind::Group, "group-ops")).await;

    h.press("2").await;
    let screen = h.render(120, 24);
    assert!(screen.contains("Failed to load members: Service unavailable"));
    assert!(!screen.contains("No members"));

    h.press("r").await;
    assert_eq!(h.visible_rows(), vec!["jdoe".to_string()]);
}

#[tokio::test]
async fn test_member_picker_load_failure() {
    let api = MockApi::demo();
    api.fail_next("list available members", "Service unavailable");
    let mut h = ScreenHarness::mount(api, ScreenSpec::detail(EntityKind::Group, "group-ops")).await;

    h.press("2").await;
    h.press("a").await;
    let screen = h.render(120, 24);
    assert!(screen.contains("Failed to load available users"));
    assert!(!screen.contains("No users available"));

    h.press("enter").await;
    assert_eq!(
        status_text(&h),
        Some((
            StatusKind::Error,
            "Failed to load available users: Service unavailable".to_string()
        ))
    );
    assert_eq!(h.mode(), ModeKind::AddMember);
    assert_eq!(h.api().mutation_count(), 0);
}

#[tokio::test]
async fn test_role_permissions_add() {
    let mut h =
        ScreenHarness::mount(MockApi::demo(), ScreenSpec::detail(EntityKind::Role, "role-ops")).await;

    h.press("2").await;
    h.press("a").await;
    assert_eq!(h.mode(), ModeKind::AddPermission);

    h.type_text("inventory").await;
    h.press("enter").await;
    assert_eq!(h.last_status().map(|s| s.kind), Some(StatusKind::Error));
    assert_eq!(h.mode(), ModeKind::AddPermission);
    assert_eq!(h.api().mutation_count(), 0);

    h.type_text(":groups:read").await;
    h.press("enter").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Success, "Permission added successfully".to_string()))
    );
    assert!(h
        .visible_rows()
        .contains(&"inventory:groups:read".to_string()));
}

#[tokio::test]
async fn test_edit_role_name() {
    let mut h =
        ScreenHarness::mount(MockApi::demo(), ScreenSpec::detail(EntityKind::Role, "role-ops")).await;

    h.press("e").await;
    assert_eq!(h.mode(), ModeKind::Edit);
    for _ in 0.."Ops Engineer".len() {
        h.press_only("backspace");
    }
    h.type_text("Ops Lead").await;
    h.press("enter").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Success, "Role updated successfully".to_string()))
    );
    assert_eq!(h.mode(), ModeKind::Browse);
    assert_eq!(h.title(), "Role: Ops Lead");
}

#[tokio::test]
async fn test_edit_to_blank_name_never_updates() {
    let mut h =
        ScreenHarness::mount(MockApi::demo(), ScreenSpec::detail(EntityKind::Role, "role-ops")).await;

    h.press("e").await;
    for _ in 0.."Ops Engineer".len() {
        h.press_only("backspace");
    }
    h.press("enter").await;

    assert_eq!(
        status_text(&h),
        Some((StatusKind::Error, "Name is required".to_string()))
    );
    assert_eq!(h.mode(), ModeKind::Edit);
    assert_eq!(h.api().count("update"), 0);

    h.press("esc").await;
    assert_eq!(h.mode(), ModeKind::Browse);
    assert_eq!(h.title(), "Role: Ops Engineer");
}

#[tokio::test]
async fn test_system_role_is_locked() {
    let mut h =
        ScreenHarness::mount(MockApi::demo(), ScreenSpec::detail(EntityKind::Role, "role-admin")).await;

    h.press("e").await;
    assert_eq!(h.mode(), ModeKind::Browse);
    assert!(h.last_status().is_none());

    h.press("2").await;
    h.press("a").await;
    assert_eq!(h.mode(), ModeKind::Browse);

    h.press("d").await;
    assert_eq!(
        status_text(&h),
        Some((StatusKind::Error, "Cannot delete system roles".to_string()))
    );
    assert_eq!(h.api().mutation_count(), 0);
}

#[tokio::test]
async fn test_detail_load_failure() {
    let mut h =
        ScreenHarness::mount(MockApi::demo(), ScreenSpec::detail(EntityKind::Role, "missing")).await;

    let screen = h.render(100, 30);
    assert!(screen.contains("Failed to load role"));
    assert!(screen.contains("Esc to go back"));

    // nothing but leaving works
    h.press("e").await;
    h.press("d").await;
    assert_eq!(h.mode(), ModeKind::Browse);
    assert_eq!(h.api().mutation_count(), 0);
}

#[tokio::test]
async fn test_delete_from_detail_returns_to_list() {
    let mut h = ScreenHarness::mount(MockApi::demo(), ScreenSpec::List(EntityKind::Group)).await;

    h.press("down").await;
    h.press("enter").await;
    h.press("d").await;
    h.press("y").await;

    assert_eq!(h.depth(), 1);
    assert_eq!(
        status_text(&h),
        Some((StatusKind::Success, "Group deleted successfully".to_string()))
    );
    assert_eq!(h.visible_rows(), vec!["Default access".to_string()]);
}

#[tokio::test]
async fn test_completion_after_leaving_is_discarded() {
    let mut h = ScreenHarness::mount(MockApi::demo(), ScreenSpec::List(EntityKind::Group)).await;

    h.press("down").await;
    h.press("enter").await;
    h.press("d").await;
    h.press_only("y");
    assert_eq!(h.pending_mutations(), 1);

    h.press_only("esc");
    assert_eq!(h.depth(), 1);

    h.settle().await;
    assert_eq!(h.api().count("delete group"), 1);
    assert!(h.last_status().is_none());
    assert_eq!(h.depth(), 1);
}
