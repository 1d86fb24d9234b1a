macro_rules! designators {
	($(#[$enum_meta:meta])* $vis:vis enum $enum_id:ident, struct $struct_id:ident { $($(#[$meta:meta])* $field:ident => $id:ident : $tag:literal = $name:literal),* }) => {
		$(#[$enum_meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
		$vis enum $enum_id {
			$($(#[$meta])* $id),*
		}

		impl $enum_id {
			pub const COUNT: usize = $crate::aamva::dlid::designators!(@count $($id,)*);
			pub const LIST: [Self; Self::COUNT] = [$(Self::$id),*];

			pub fn from_id(id: &[u8; 3]) -> Option<Self> {
				match id {
					$($tag => Some(Self::$id),)*
					_ => None
				}
			}

			pub fn id(&self) -> &'static [u8; 3] {
				match self {
					$(Self::$id => $tag),*
				}
			}

			/// Human-readable field name, used as the record key.
			pub fn name(&self) -> &'static str {
				match self {
					$(Self::$id => $name),*
				}
			}

			pub fn from_name(name: &str) -> Option<Self> {
				match name {
					$($name => Some(Self::$id),)*
					_ => None
				}
			}
		}

		impl $enum_id {
			pub fn string_id(&self) -> &'static str {
				unsafe {
					// SAFETY: designator tags are byte string literals of
					//         ASCII uppercase letters.
					std::str::from_utf8_unchecked(self.id())
				}
			}
		}

		#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
		$vis struct $struct_id {
			$($(#[$meta])* pub $field: Option<String>),*
		}

		impl $struct_id {
			pub fn new() -> Self {
				Self::default()
			}

			pub fn is_empty(&self) -> bool {
				$(
					if self.$field.is_some() {
						return false
					}
				)*

				true
			}

			pub fn len(&self) -> usize {
				let mut result = 0;

				$(
					if self.$field.is_some() {
						result += 1
					}
				)*

				result
			}

			pub fn get(&self, element: $enum_id) -> Option<&str> {
				match element {
					$($enum_id::$id => self.$field.as_deref()),*
				}
			}

			pub fn contains(&self, element: $enum_id) -> bool {
				self.get(element).is_some()
			}

			pub fn set(&mut self, element: $enum_id, value: Option<String>) {
				match element {
					$($enum_id::$id => { self.$field = value }),*
				}
			}

			pub fn insert(&mut self, element: $enum_id, value: String) -> Option<String> {
				match element {
					$($enum_id::$id => self.$field.replace(value)),*
				}
			}

			pub fn remove(&mut self, element: $enum_id) -> Option<String> {
				match element {
					$($enum_id::$id => self.$field.take()),*
				}
			}

			/// Iterates over the present fields, in table order.
			pub fn iter(&self) -> impl Iterator<Item = ($enum_id, &str)> {
				[$(
					self.$field
						.as_deref()
						.map(|value| ($enum_id::$id, value))
				),*].into_iter().flatten()
			}
		}
	};
	(@count $a:ident, $($rest:ident,)*) => {
		1usize + $crate::aamva::dlid::designators!(@count $($rest,)*)
	};
	(@count) => {
		0usize
	}
}

pub(crate) use designators;
