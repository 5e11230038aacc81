use serde_json::{json, Value};

/// The built-in defaults every user configuration is deep-merged
/// under (spec.md §4.1.1). Per-vhost/publication/subscription
/// defaults are applied again, more specifically, later in the
/// pipeline — this is only the top-level scaffold.
pub fn baseline() -> Value {
    json!({
        "vhosts": {},
        "publications": {},
        "subscriptions": {},
        "shovels": {},
        "encryption": {},
        "redeliveries": { "counters": {} },
        "defaults": {
            "vhost": {
                "namespace": "",
                "concurrency": 1,
                "connectionStrategy": "fixed",
                "publicationChannelPools": 1,
                "connection": {
                    "protocol": "amqp",
                    "hostname": "localhost",
                    "port": 5672,
                    "user": "guest",
                    "password": "guest",
                    "vhost": "/",
                    "options": {},
                    "socketOptions": {}
                },
                "exchanges": {
                    "assert": true,
                    "options": {}
                },
                "queues": {
                    "assert": true,
                    "options": {}
                },
                "bindings": {
                    "qualifyBindingKeys": false
                }
            },
            "publication": {
                "confirm": true,
                "autoCreated": false,
                "deprecated": false
            },
            "subscription": {
                "prefetch": 1,
                "autoCreated": false
            },
            "shovel": {},
            "redeliveries": {
                "counters": {
                    "stub": {},
                    "inMemory": { "size": 10000 },
                    "clustered": {}
                }
            }
        }
    })
}
