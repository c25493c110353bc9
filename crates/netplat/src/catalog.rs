use netplat_core::plugin_system::PluginCatalog;

/// Every product plugin compiled into this binary, keyed by the name a
/// product directory's manifest refers to
pub fn catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with(netplat_netbox::PLUGIN_NAME, netplat_netbox::create_plugin)
        .with(netplat_cartography::PLUGIN_NAME, netplat_cartography::create_plugin)
        .with(netplat_topology::PLUGIN_NAME, netplat_topology::create_plugin)
        .with(netplat_librenms::PLUGIN_NAME, netplat_librenms::create_plugin)
        .with(netplat_diagrams::PLUGIN_NAME, netplat_diagrams::create_plugin)
}
