pub trait ShortTypeName
{
    fn short_type_name() -> &'static str;
}
impl<T: ?Sized> ShortTypeName for T
{
    #[inline]
    fn short_type_name() -> &'static str
    {
        let type_name = std::any::type_name::<T>();
        // strip generic args before looking for the last path segment
        let base = match type_name.find('<')
        {
            None => type_name,
            Some(i) => &type_name[..i],
        };
        match base.rfind(':')
        {
            None => base,
            Some(i) => &base[(i + 1)..]
        }
    }
}
