/// Macro pour déclarer l'énumération des actions d'un service
///
/// Génère l'énumération, son implémentation de
/// [`UpnpAction`](crate::actions::UpnpAction) (liste complète et nom
/// protocolaire de chaque action) et `Display`.
///
/// # Syntaxe
///
/// ```
/// pmoupnp::upnp_actions! {
///     /// Actions du service Time
///     pub enum TimeAction {
///         Time,
///     }
/// }
///
/// use pmoupnp::actions::UpnpAction;
/// assert_eq!(TimeAction::from_name("Time"), Some(TimeAction::Time));
/// assert_eq!(TimeAction::ALL.len(), 1);
/// ```
#[macro_export]
macro_rules! upnp_actions {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),*
        }

        impl $crate::actions::UpnpAction for $name {
            const ALL: &'static [Self] = &[ $( $name::$variant ),* ];

            fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant) ),*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::actions::UpnpAction::name(self))
            }
        }
    };
}
