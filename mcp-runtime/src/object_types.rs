use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Friendly object-type names grouped by API section.
const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "DCIM (Device and Infrastructure)",
        &[
            ("cables", "dcim/cables"),
            ("console-ports", "dcim/console-ports"),
            ("console-server-ports", "dcim/console-server-ports"),
            ("devices", "dcim/devices"),
            ("device-bays", "dcim/device-bays"),
            ("device-roles", "dcim/device-roles"),
            ("device-types", "dcim/device-types"),
            ("front-ports", "dcim/front-ports"),
            ("interfaces", "dcim/interfaces"),
            ("inventory-items", "dcim/inventory-items"),
            ("locations", "dcim/locations"),
            ("manufacturers", "dcim/manufacturers"),
            ("modules", "dcim/modules"),
            ("module-bays", "dcim/module-bays"),
            ("module-types", "dcim/module-types"),
            ("platforms", "dcim/platforms"),
            ("power-feeds", "dcim/power-feeds"),
            ("power-outlets", "dcim/power-outlets"),
            ("power-panels", "dcim/power-panels"),
            ("power-ports", "dcim/power-ports"),
            ("racks", "dcim/racks"),
            ("rack-reservations", "dcim/rack-reservations"),
            ("rack-roles", "dcim/rack-roles"),
            ("regions", "dcim/regions"),
            ("sites", "dcim/sites"),
            ("site-groups", "dcim/site-groups"),
            ("virtual-chassis", "dcim/virtual-chassis"),
        ],
    ),
    (
        "IPAM (IP Address Management)",
        &[
            ("asns", "ipam/asns"),
            ("asn-ranges", "ipam/asn-ranges"),
            ("aggregates", "ipam/aggregates"),
            ("fhrp-groups", "ipam/fhrp-groups"),
            ("ip-addresses", "ipam/ip-addresses"),
            ("ip-ranges", "ipam/ip-ranges"),
            ("prefixes", "ipam/prefixes"),
            ("rirs", "ipam/rirs"),
            ("roles", "ipam/roles"),
            ("route-targets", "ipam/route-targets"),
            ("services", "ipam/services"),
            ("vlans", "ipam/vlans"),
            ("vlan-groups", "ipam/vlan-groups"),
            ("vrfs", "ipam/vrfs"),
        ],
    ),
    (
        "Circuits",
        &[
            ("circuits", "circuits/circuits"),
            ("circuit-types", "circuits/circuit-types"),
            ("circuit-terminations", "circuits/circuit-terminations"),
            ("providers", "circuits/providers"),
            ("provider-networks", "circuits/provider-networks"),
        ],
    ),
    (
        "Virtualization",
        &[
            ("clusters", "virtualization/clusters"),
            ("cluster-groups", "virtualization/cluster-groups"),
            ("cluster-types", "virtualization/cluster-types"),
            ("virtual-machines", "virtualization/virtual-machines"),
            ("vm-interfaces", "virtualization/interfaces"),
        ],
    ),
    (
        "Tenancy",
        &[
            ("tenants", "tenancy/tenants"),
            ("tenant-groups", "tenancy/tenant-groups"),
            ("contacts", "tenancy/contacts"),
            ("contact-groups", "tenancy/contact-groups"),
            ("contact-roles", "tenancy/contact-roles"),
        ],
    ),
    (
        "VPN",
        &[
            ("ike-policies", "vpn/ike-policies"),
            ("ike-proposals", "vpn/ike-proposals"),
            ("ipsec-policies", "vpn/ipsec-policies"),
            ("ipsec-profiles", "vpn/ipsec-profiles"),
            ("ipsec-proposals", "vpn/ipsec-proposals"),
            ("l2vpns", "vpn/l2vpns"),
            ("tunnels", "vpn/tunnels"),
            ("tunnel-groups", "vpn/tunnel-groups"),
        ],
    ),
    (
        "Wireless",
        &[
            ("wireless-lans", "wireless/wireless-lans"),
            ("wireless-lan-groups", "wireless/wireless-lan-groups"),
            ("wireless-links", "wireless/wireless-links"),
        ],
    ),
];

static OBJECT_TYPES: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    SECTIONS
        .iter()
        .flat_map(|(_, entries)| entries.iter().copied())
        .collect()
});

/// API path for a friendly object-type name.
pub fn endpoint_for(object_type: &str) -> Option<&'static str> {
    OBJECT_TYPES.get(object_type).copied()
}

/// All valid names, sorted.
pub fn names() -> impl Iterator<Item = &'static str> {
    OBJECT_TYPES.keys().copied()
}

/// Sorted `- name` list, one per line.
pub fn sorted_name_list() -> String {
    names()
        .map(|name| format!("- {name}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Section-grouped listing used in tool descriptions.
pub fn catalog_text() -> String {
    SECTIONS
        .iter()
        .map(|(title, entries)| {
            let lines = entries
                .iter()
                .map(|(name, _)| format!("- {name}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("{title}:\n{lines}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
