/// Finalizer attached to every cluster object while the operator still owns children for it.
pub const FINALIZER: &str = "teamcity.jetbrains.com/finalizer";

/// Annotation key selecting the zero-downtime upgrade policy, on either the cluster or a node.
pub const UPDATE_POLICY_ANNOTATION: &str = "update-policy";
/// `UPDATE_POLICY_ANNOTATION` value on the cluster object that routes the whole cluster through H.
pub const UPDATE_POLICY_ZERO_DOWN_TIME: &str = "zero-down-time";
/// `UPDATE_POLICY_ANNOTATION` value on a node that routes that node through H.
pub const UPDATE_POLICY_UPDATE_WITH_RO: &str = "update-with-ro";

/// Default label carrying the cluster name.
pub const LABEL_NAME: &str = "app.kubernetes.io/name";
/// Default label identifying every object this operator owns as part of a server cluster.
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
/// Value of `LABEL_COMPONENT` on every owned object.
pub const LABEL_COMPONENT_VALUE: &str = "teamcity-server";
/// Default label grouping all objects under the same logical product.
pub const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
/// Value of `LABEL_PART_OF` on every owned object.
pub const LABEL_PART_OF_VALUE: &str = "teamcity";
/// Per-workload-set label naming the node it was built from.
pub const LABEL_NODE_NAME: &str = "teamcity.jetbrains.com/node-name";
/// Per-workload-set label naming the node's role.
pub const LABEL_ROLE: &str = "teamcity.jetbrains.com/role";

/// `LABEL_ROLE` value for the main node's workload set.
pub const ROLE_MAIN: &str = "main";
/// `LABEL_ROLE` value for a secondary node's workload set.
pub const ROLE_SECONDARY: &str = "secondary";
/// `LABEL_ROLE` value for the ephemeral read-only replica created during an upgrade.
pub const ROLE_UPDATE_WITH_RO: &str = "update-with-ro";

/// Suffix appended to the main node's name to derive the read-only replica's name.
pub const RO_NODE_SUFFIX: &str = "-update-replica";

/// Prefix of the checkpoint `ConfigMap`'s name: `<prefix>-<cluster>`.
pub const CHECKPOINT_NAME_PREFIX: &str = "update-checkpoint";
/// Data key under which the checkpoint `ConfigMap` stores the current stage.
pub const CHECKPOINT_STAGE_KEY: &str = "stage";

/// Name of the secret-sourced volume carrying `database.properties`.
pub const DATABASE_PROPERTIES_VOLUME_NAME: &str = "database-properties";
/// Sub-path under the volume mount at which `database.properties` is projected.
pub const DATABASE_PROPERTIES_SUB_PATH: &str = "database.properties";
/// Path (relative to the data dir) at which the database properties file is mounted.
pub const DATABASE_PROPERTIES_MOUNT_PATH: &str = "/config/database.properties";

/// Name of the main container in every workload set this operator manages.
pub const TEAMCITY_CONTAINER_NAME: &str = "teamcity-server";

/// Key expected in the database secret's data, holding `key=value` connection properties.
pub const DATABASE_SECRET_KEY: &str = "database.properties";

/// Responsibility string: the node accepting user-data modification requests. Unique to main.
pub const RESP_MAIN_NODE: &str = "MAIN_NODE";
/// Responsibility string: processing incoming build messages.
pub const RESP_CAN_PROCESS_BUILD_MESSAGES: &str = "CAN_PROCESS_BUILD_MESSAGES";
/// Responsibility string: checking configured VCS roots for changes.
pub const RESP_CAN_CHECK_FOR_CHANGES: &str = "CAN_CHECK_FOR_CHANGES";
/// Responsibility string: processing build triggers.
pub const RESP_CAN_PROCESS_BUILD_TRIGGERS: &str = "CAN_PROCESS_BUILD_TRIGGERS";
/// Responsibility string: processing requests that modify user data. Required on main.
pub const RESP_CAN_PROCESS_USER_DATA_MODIFICATION_REQUESTS: &str =
    "CAN_PROCESS_USER_DATA_MODIFICATION_REQUESTS";

/// All responsibility values, in the order the operator prints them when joining a list.
pub const ALL_RESPONSIBILITIES: [&str; 5] = [
    RESP_MAIN_NODE,
    RESP_CAN_PROCESS_BUILD_MESSAGES,
    RESP_CAN_CHECK_FOR_CHANGES,
    RESP_CAN_PROCESS_BUILD_TRIGGERS,
    RESP_CAN_PROCESS_USER_DATA_MODIFICATION_REQUESTS,
];

/// Server-side-apply field manager identity used for every `Patch::Apply`.
pub const DEFAULT_FIELD_MANAGER: &str = "teamcity-operator";
